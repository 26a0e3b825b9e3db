use crate::classify::RegionValue;
use crate::config::DataConfig;
use crate::data::table::load_table;
use crate::data::topology::convert_bytes;
use crate::error::{MapError, Result};
use crate::map::BoundaryFeatureCollection;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Where boundary files live: a local directory or an http(s) base URL
#[derive(Clone, Debug)]
pub enum BoundarySource {
    Directory(PathBuf),
    Http { base_url: String, client: reqwest::Client },
}

impl BoundarySource {
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            BoundarySource::Http {
                base_url: source.trim_end_matches('/').to_string(),
                client: reqwest::Client::new(),
            }
        } else {
            BoundarySource::Directory(PathBuf::from(source))
        }
    }

    /// `<base>/topojson/<country-lowercased>.topojson`
    pub fn location(&self, country: &str) -> String {
        let file = format!("topojson/{}.topojson", country.to_lowercase());
        match self {
            BoundarySource::Directory(dir) => dir.join(file).display().to_string(),
            BoundarySource::Http { base_url, .. } => format!("{base_url}/{file}"),
        }
    }

    pub async fn fetch(&self, country: &str) -> Result<Vec<u8>> {
        let location = self.location(country);
        match self {
            BoundarySource::Directory(_) => {
                tokio::fs::read(&location).await.map_err(|source| MapError::Io {
                    path: PathBuf::from(&location),
                    source,
                })
            }
            BoundarySource::Http { client, .. } => {
                let resp = client.get(&location).send().await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(MapError::Load {
                        url: location,
                        status: status.as_u16(),
                    });
                }
                Ok(resp.bytes().await?.to_vec())
            }
        }
    }

    /// Fetch and convert one country's boundaries
    pub async fn load_country(&self, country: &str) -> Result<BoundaryFeatureCollection> {
        let mut bytes = self.fetch(country).await?;
        let fc = convert_bytes(&mut bytes)?;
        Ok(BoundaryFeatureCollection::from_geojson(&fc))
    }
}

/// Monotonic request counter; only the newest ticket is current
#[derive(Debug, Default)]
pub struct LoadGate {
    generation: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket(u64);

impl LoadGate {
    pub fn issue(&mut self) -> Ticket {
        self.generation += 1;
        Ticket(self.generation)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.generation
    }
}

/// Result of a background load
#[derive(Debug)]
pub enum LoadEvent {
    Boundary {
        ticket: Ticket,
        country: String,
        result: Result<BoundaryFeatureCollection>,
    },
    Table {
        ticket: Ticket,
        path: PathBuf,
        result: Result<Vec<RegionValue>>,
    },
}

/// Runs fetches and parses off the UI thread and hands back only results
/// that have not been superseded by a newer request of the same kind.
pub struct Loader {
    runtime: Runtime,
    source: BoundarySource,
    tx: UnboundedSender<LoadEvent>,
    rx: UnboundedReceiver<LoadEvent>,
    boundary_gate: LoadGate,
    table_gate: LoadGate,
}

impl Loader {
    pub fn new(source: BoundarySource) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("choropleth-loader")
            .enable_all()
            .build()?;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            runtime,
            source,
            tx,
            rx,
            boundary_gate: LoadGate::default(),
            table_gate: LoadGate::default(),
        })
    }

    pub fn request_boundary(&mut self, country: &str) -> Ticket {
        let ticket = self.boundary_gate.issue();
        let source = self.source.clone();
        let country = country.to_string();
        let tx = self.tx.clone();
        tracing::info!(%country, location = %source.location(&country), "loading boundaries");

        self.runtime.spawn(async move {
            let result = source.load_country(&country).await;
            let _ = tx.send(LoadEvent::Boundary {
                ticket,
                country,
                result,
            });
        });
        ticket
    }

    pub fn request_table(&mut self, path: &Path, config: &DataConfig) -> Ticket {
        let ticket = self.table_gate.issue();
        let path = path.to_path_buf();
        let config = config.clone();
        let tx = self.tx.clone();
        tracing::info!(path = %path.display(), "loading table");

        self.runtime.spawn_blocking(move || {
            let result = load_table(&path, &config);
            let _ = tx.send(LoadEvent::Table {
                ticket,
                path,
                result,
            });
        });
        ticket
    }

    /// Drain finished loads, dropping stale ones
    pub fn poll(&mut self) -> Vec<LoadEvent> {
        let mut ready = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            if self.is_current(&event) {
                ready.push(event);
            } else {
                tracing::debug!(?event, "discarding superseded load");
            }
        }
        ready
    }

    fn is_current(&self, event: &LoadEvent) -> bool {
        match event {
            LoadEvent::Boundary { ticket, .. } => self.boundary_gate.is_current(*ticket),
            LoadEvent::Table { ticket, .. } => self.table_gate.is_current(*ticket),
        }
    }

    /// Block until the next current event arrives. Used outside the UI loop.
    pub fn wait(&mut self) -> Option<LoadEvent> {
        loop {
            let event = self.runtime.block_on(self.rx.recv())?;
            if self.is_current(&event) {
                return Some(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const TOPOLOGY: &str = r#"{"type":"Topology",
        "arcs":[[[0,0],[1,0],[1,1],[0,1],[0,0]]],
        "objects":{"cantons":{"type":"GeometryCollection","geometries":[
            {"type":"Polygon","arcs":[[0]],"properties":{"name":"A"}}]}}}"#;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tui-choropleth-{name}-{}", std::process::id()));
        fs::create_dir_all(dir.join("topojson")).unwrap();
        dir
    }

    #[test]
    fn test_gate_only_latest_current() {
        let mut gate = LoadGate::default();
        let first = gate.issue();
        let second = gate.issue();
        assert!(!gate.is_current(first));
        assert!(gate.is_current(second));
    }

    #[test]
    fn test_location_lowercases_country() {
        let http = BoundarySource::parse("https://maps.example.org/");
        assert_eq!(
            http.location("Switzerland"),
            "https://maps.example.org/topojson/switzerland.topojson"
        );
        let dir = BoundarySource::parse("assets");
        assert!(dir.location("CHILE").ends_with("chile.topojson"));
    }

    #[test]
    fn test_directory_load() {
        let dir = scratch_dir("dirload");
        fs::write(dir.join("topojson/testland.topojson"), TOPOLOGY).unwrap();

        let mut loader = Loader::new(BoundarySource::Directory(dir)).unwrap();
        loader.request_boundary("Testland");
        match loader.wait() {
            Some(LoadEvent::Boundary { result, country, .. }) => {
                assert_eq!(country, "Testland");
                let fc = result.unwrap();
                assert_eq!(fc.regions.len(), 1);
                assert_eq!(fc.regions[0].name.as_deref(), Some("A"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = scratch_dir("missing");
        let mut loader = Loader::new(BoundarySource::Directory(dir)).unwrap();
        loader.request_boundary("Atlantis");
        match loader.wait() {
            Some(LoadEvent::Boundary { result, .. }) => {
                assert!(matches!(result, Err(MapError::Io { .. })));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_http_not_found_is_load_error() {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        std_listener.set_nonblocking(true).unwrap();
        let port = std_listener.local_addr().unwrap().port();

        let mut loader = Loader::new(BoundarySource::parse(&format!("http://127.0.0.1:{port}"))).unwrap();
        loader.runtime.spawn(async move {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
        });

        loader.request_boundary("Chile");
        match loader.wait() {
            Some(LoadEvent::Boundary {
                result: Err(MapError::Load { url, status }),
                ..
            }) => {
                assert_eq!(status, 404);
                assert_eq!(url, format!("http://127.0.0.1:{port}/topojson/chile.topojson"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_superseded_request_discarded() {
        let dir = scratch_dir("stale");
        fs::write(dir.join("topojson/first.topojson"), TOPOLOGY).unwrap();
        fs::write(dir.join("topojson/second.topojson"), TOPOLOGY).unwrap();

        let mut loader = Loader::new(BoundarySource::Directory(dir)).unwrap();
        loader.request_boundary("First");
        loader.request_boundary("Second");
        match loader.wait() {
            Some(LoadEvent::Boundary { country, .. }) => assert_eq!(country, "Second"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_table_load() {
        let dir = scratch_dir("table");
        let path = dir.join("data.csv");
        fs::write(&path, "Canton,Total\nA,5\nB,\n").unwrap();

        let mut loader = Loader::new(BoundarySource::Directory(dir)).unwrap();
        loader.request_table(&path, &DataConfig::default());
        match loader.wait() {
            Some(LoadEvent::Table { result, .. }) => {
                let rows = result.unwrap();
                assert_eq!(rows, vec![RegionValue::new("A", Some(5.0)), RegionValue::new("B", None)]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

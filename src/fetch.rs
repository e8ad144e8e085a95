use std::fmt::Debug;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, error, info, trace};

use crate::domain::PTError;
use crate::table::{Row, Value};

pub const DEFAULT_API_URL: &str = "https://rickandmortyapi.com/api/character";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Place {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Character {
    pub id: i64,
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub origin: Option<Place>,
    #[serde(default)]
    pub location: Option<Place>,
    #[serde(default)]
    pub episode: Vec<String>,
}

impl Character {
    pub fn to_row(&self) -> Row {
        Row::new()
            .with("id", self.id)
            .with("name", self.name.as_str())
            .with("status", non_empty(&self.status))
            .with("species", non_empty(&self.species))
            .with("type", non_empty(&self.kind))
            .with("gender", non_empty(&self.gender))
            .with("origin", place_name(&self.origin))
            .with("location", place_name(&self.location))
            .with("episodes", self.episode.len() as i64)
            .with("image", self.image.as_str())
    }
}

// The API sends "" for unknown values
fn non_empty(v: &Option<String>) -> Value {
    match v.as_deref() {
        Some(s) if !s.is_empty() => Value::from(s),
        _ => Value::Null,
    }
}

fn place_name(place: &Option<Place>) -> Value {
    match place {
        Some(p) if !p.name.is_empty() => Value::from(p.name.as_str()),
        _ => Value::Null,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageInfo {
    pub count: u64,
    pub pages: u64,
    pub next: Option<String>,
    pub prev: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CharacterPage {
    #[serde(default)]
    pub info: Option<PageInfo>,
    pub results: Vec<Character>,
}

pub fn decode_page(body: &str) -> Result<Vec<Character>, PTError> {
    let page: CharacterPage = serde_json::from_str(body)?;
    if let Some(info) = &page.info {
        trace!("Remote reports {} characters on {} pages", info.count, info.pages);
    }
    Ok(page.results)
}

/// Somewhere characters can be loaded from.
pub trait CharacterSource: Send + Sync + Debug {
    fn fetch(&self) -> Result<Vec<Character>, PTError>;
}

#[derive(Debug)]
pub struct HttpCharacterSource {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpCharacterSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, PTError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl CharacterSource for HttpCharacterSource {
    fn fetch(&self) -> Result<Vec<Character>, PTError> {
        let start_time = Instant::now();
        let body = self
            .client
            .get(&self.url)
            .send()?
            .error_for_status()?
            .text()?;
        let characters = decode_page(&body)?;
        info!(
            "Fetched {} characters from {} in {}ms",
            characters.len(),
            self.url,
            start_time.elapsed().as_millis()
        );
        Ok(characters)
    }
}

struct FetchResult {
    generation: u64,
    result: Result<Vec<Character>, PTError>,
}

/// Runs fetches on a worker thread and hands the results back to the event loop.
///
/// Each request gets a new generation. Results of older generations are
/// dropped on arrival, so a late response never reaches a page that was left
/// or reloaded in the meantime.
pub struct Fetcher {
    source: Arc<dyn CharacterSource>,
    sender: flume::Sender<FetchResult>,
    receiver: flume::Receiver<FetchResult>,
    generation: u64,
    in_flight: bool,
}

impl Fetcher {
    pub fn new(source: Arc<dyn CharacterSource>) -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            source,
            sender,
            receiver,
            generation: 0,
            in_flight: false,
        }
    }

    pub fn request(&mut self) -> u64 {
        self.generation += 1;
        self.in_flight = true;
        let generation = self.generation;
        let source = Arc::clone(&self.source);
        let sender = self.sender.clone();
        debug!("Starting fetch #{generation}");
        thread::spawn(move || {
            let result = source.fetch();
            if let Err(e) = &result {
                error!("Fetch #{generation} failed: {e}");
            }
            // The receiver lives as long as the Fetcher; after that nobody cares.
            let _ = sender.send(FetchResult { generation, result });
        });
        generation
    }

    /// Invalidates the outstanding request, if any.
    pub fn cancel(&mut self) {
        if self.in_flight {
            debug!("Cancelling fetch #{}", self.generation);
        }
        self.generation += 1;
        self.in_flight = false;
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Result of the current request, once it arrived.
    pub fn poll(&mut self) -> Option<Result<Vec<Character>, PTError>> {
        while let Ok(msg) = self.receiver.try_recv() {
            if msg.generation == self.generation && self.in_flight {
                self.in_flight = false;
                return Some(msg.result);
            }
            debug!(
                "Discarding stale response #{} (current #{})",
                msg.generation, self.generation
            );
        }
        None
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const BODY: &str = r#"{
        "info": {"count": 2, "pages": 1, "next": null, "prev": null},
        "results": [
            {"id": 1, "name": "Rick Sanchez", "status": "Alive", "species": "Human", "type": "",
             "gender": "Male", "origin": {"name": "Earth (C-137)", "url": ""},
             "location": {"name": "Citadel of Ricks", "url": ""},
             "image": "https://example.org/1.jpeg", "episode": ["e1", "e2"]},
            {"id": 2, "name": "Morty Smith", "image": "https://example.org/2.jpeg"}
        ]
    }"#;

    #[derive(Debug)]
    pub(crate) struct MockSource {
        pub characters: Vec<Character>,
        pub fail: bool,
        pub delay: Duration,
        pub calls: AtomicUsize,
    }

    impl MockSource {
        pub(crate) fn with(characters: Vec<Character>) -> Self {
            Self {
                characters,
                fail: false,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                fail: true,
                ..Self::with(Vec::new())
            }
        }
    }

    impl CharacterSource for MockSource {
        fn fetch(&self) -> Result<Vec<Character>, PTError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            if self.fail {
                Err(PTError::LoadingFailed("mock failure".into()))
            } else {
                Ok(self.characters.clone())
            }
        }
    }

    pub(crate) fn sample_characters() -> Vec<Character> {
        decode_page(BODY).expect("fixture decodes")
    }

    /// Polls until a result arrives or the timeout passes.
    pub(crate) fn wait(fetcher: &mut Fetcher) -> Option<Result<Vec<Character>, PTError>> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(result) = fetcher.poll() {
                return Some(result);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn decodes_envelope_with_optional_fields() {
        let characters = sample_characters();
        assert_eq!(characters.len(), 2);
        assert_eq!(characters[0].origin.as_ref().map(|p| p.name.as_str()), Some("Earth (C-137)"));
        assert_eq!(characters[1].status, None);
        assert!(characters[1].episode.is_empty());
    }

    #[test]
    fn rejects_body_without_results() {
        assert!(matches!(decode_page(r#"{"error": "nope"}"#), Err(PTError::DecodeError(_))));
    }

    #[test]
    fn row_uses_placeholders_for_missing_fields() {
        let characters = sample_characters();
        let rick = characters[0].to_row();
        assert_eq!(rick.value("episodes"), Value::from(2));
        assert_eq!(rick.value("type"), Value::Null);
        let morty = characters[1].to_row();
        assert_eq!(morty.value("origin"), Value::Null);
        assert_eq!(morty.value("name"), Value::from("Morty Smith"));
    }

    #[test]
    fn delivers_result_of_current_request() {
        let mut fetcher = Fetcher::new(Arc::new(MockSource::with(sample_characters())));
        fetcher.request();
        assert!(fetcher.is_in_flight());
        let result = wait(&mut fetcher);
        assert!(matches!(result, Some(Ok(ref c)) if c.len() == 2));
        assert!(!fetcher.is_in_flight());
    }

    #[test]
    fn drops_response_of_cancelled_request() {
        let source = Arc::new(MockSource::with(sample_characters()));
        let mut fetcher = Fetcher::new(source.clone());
        fetcher.request();
        fetcher.cancel();
        // Give the worker time to answer
        while source.calls.load(Ordering::SeqCst) == 0 {
            thread::sleep(Duration::from_millis(5));
        }
        thread::sleep(Duration::from_millis(50));
        assert!(fetcher.poll().is_none());
    }

    #[test]
    fn only_latest_of_two_requests_is_delivered() {
        let source = Arc::new(MockSource::with(sample_characters()));
        let mut fetcher = Fetcher::new(source.clone());
        let first = fetcher.request();
        let second = fetcher.request();
        assert!(second > first);
        assert!(wait(&mut fetcher).is_some());
        while source.calls.load(Ordering::SeqCst) < 2 {
            thread::sleep(Duration::from_millis(5));
        }
        thread::sleep(Duration::from_millis(50));
        assert!(fetcher.poll().is_none());
    }

    #[test]
    fn surfaces_failures() {
        let mut fetcher = Fetcher::new(Arc::new(MockSource::failing()));
        fetcher.request();
        assert!(matches!(wait(&mut fetcher), Some(Err(PTError::LoadingFailed(_)))));
    }
}

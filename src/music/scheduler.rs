use poise::serenity_prelude::UserId;
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    Off,
    Song,
    Queue,
}

impl RepeatMode {
    /// Off → Song → Queue → Off
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::Song,
            RepeatMode::Song => RepeatMode::Queue,
            RepeatMode::Queue => RepeatMode::Off,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "off" | "none" => Some(RepeatMode::Off),
            "song" | "track" => Some(RepeatMode::Song),
            "queue" | "all" => Some(RepeatMode::Queue),
            _ => None,
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepeatMode::Off => write!(f, "off"),
            RepeatMode::Song => write!(f, "song"),
            RepeatMode::Queue => write!(f, "queue"),
        }
    }
}

/// A resolved track waiting to be played
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTrack {
    pub title: String,
    /// What the input is built from, a URL or a search query
    pub source: String,
    pub is_search: bool,
    pub requester: UserId,
}

/// Queue and repeat state of one guild
#[derive(Debug, Default)]
pub struct TrackScheduler {
    queue: VecDeque<QueuedTrack>,
    current: Option<QueuedTrack>,
    repeat: RepeatMode,
    skip_requested: bool,
}

impl TrackScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a track. Returns it back when nothing is playing and it should start now.
    pub fn enqueue(&mut self, track: QueuedTrack) -> Option<QueuedTrack> {
        if self.current.is_none() {
            self.current = Some(track.clone());
            return Some(track);
        }
        self.queue.push_back(track);
        None
    }

    /// Pick the track that follows the one that just ended
    pub fn next_track(&mut self) -> Option<QueuedTrack> {
        let finished = self.current.take();
        let skipped = std::mem::take(&mut self.skip_requested);

        match (self.repeat, finished) {
            (RepeatMode::Song, Some(track)) if !skipped => {
                self.current = Some(track);
            }
            (RepeatMode::Queue, Some(track)) => {
                self.queue.push_back(track);
                self.current = self.queue.pop_front();
            }
            _ => {
                self.current = self.queue.pop_front();
            }
        }

        self.current.clone()
    }

    /// Mark the running track as skipped so song repeat doesn't replay it
    pub fn request_skip(&mut self) {
        self.skip_requested = true;
    }

    /// Drop the queue and the running track
    pub fn clear(&mut self) {
        self.queue.clear();
        self.current = None;
        self.repeat = RepeatMode::Off;
    }

    pub fn set_repeat(&mut self, mode: RepeatMode) {
        self.repeat = mode;
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    pub fn current(&self) -> Option<&QueuedTrack> {
        self.current.as_ref()
    }

    pub fn queue(&self) -> impl Iterator<Item = &QueuedTrack> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str) -> QueuedTrack {
        QueuedTrack {
            title: title.to_string(),
            source: format!("https://example.com/{}", title),
            is_search: false,
            requester: UserId::new(1),
        }
    }

    fn titles(scheduler: &TrackScheduler) -> Vec<String> {
        scheduler.queue().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn test_enqueue_starts_when_idle() {
        let mut scheduler = TrackScheduler::new();
        assert_eq!(scheduler.enqueue(track("a")), Some(track("a")));
        assert_eq!(scheduler.enqueue(track("b")), None);
        assert_eq!(scheduler.current().unwrap().title, "a");
        assert_eq!(titles(&scheduler), vec!["b"]);
    }

    #[test]
    fn test_advance_without_repeat() {
        let mut scheduler = TrackScheduler::new();
        scheduler.enqueue(track("a"));
        scheduler.enqueue(track("b"));

        assert_eq!(scheduler.next_track().unwrap().title, "b");
        assert!(scheduler.next_track().is_none());
        assert!(scheduler.current().is_none());

        // idle again, so the next track starts right away
        assert!(scheduler.enqueue(track("c")).is_some());
    }

    #[test]
    fn test_song_repeat_and_skip() {
        let mut scheduler = TrackScheduler::new();
        scheduler.enqueue(track("a"));
        scheduler.enqueue(track("b"));
        scheduler.set_repeat(RepeatMode::Song);

        assert_eq!(scheduler.next_track().unwrap().title, "a");
        scheduler.request_skip();
        assert_eq!(scheduler.next_track().unwrap().title, "b");
        assert_eq!(scheduler.next_track().unwrap().title, "b");
    }

    #[test]
    fn test_queue_repeat_rotates() {
        let mut scheduler = TrackScheduler::new();
        scheduler.enqueue(track("a"));
        scheduler.enqueue(track("b"));
        scheduler.set_repeat(RepeatMode::Queue);

        assert_eq!(scheduler.next_track().unwrap().title, "b");
        assert_eq!(scheduler.next_track().unwrap().title, "a");
        assert_eq!(titles(&scheduler), vec!["b"]);
    }

    #[test]
    fn test_clear() {
        let mut scheduler = TrackScheduler::new();
        scheduler.enqueue(track("a"));
        scheduler.enqueue(track("b"));
        scheduler.set_repeat(RepeatMode::Queue);
        scheduler.clear();

        assert!(scheduler.is_empty());
        assert!(scheduler.current().is_none());
        assert_eq!(scheduler.repeat(), RepeatMode::Off);
        assert!(scheduler.next_track().is_none());
    }

    #[test]
    fn test_repeat_mode_parse_and_cycle() {
        assert_eq!(RepeatMode::parse("SONG"), Some(RepeatMode::Song));
        assert_eq!(RepeatMode::parse("all"), Some(RepeatMode::Queue));
        assert_eq!(RepeatMode::parse("maybe"), None);
        assert_eq!(RepeatMode::Off.cycle(), RepeatMode::Song);
        assert_eq!(RepeatMode::Queue.cycle(), RepeatMode::Off);
        assert_eq!(RepeatMode::Song.to_string(), "song");
    }
}

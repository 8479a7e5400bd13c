//! Store worker
//!
//! Playlist and cursor mutations run here, one job at a time, on a blocking
//! thread that owns the store. Each finished job is posted back to the
//! coordinator inbox so broadcasts stay on the coordinator's serial path.

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

use super::coordinator::RoomEvent;
use super::notice::RoomSnapshot;
use crate::error::Result;
use crate::invariants::assert_cursor_invariants;
use crate::models::{
    index_after_removal, next_index, ParticipantId, PlaybackCursor, PlaylistEntry,
    VideoDescriptor,
};
use crate::storage::PlaylistRepository;

/// Work queued for the store
#[derive(Debug)]
pub(crate) enum StoreJob {
    Append {
        requester: ParticipantId,
        descriptor: VideoDescriptor,
    },
    Remove {
        source_id: String,
    },
    Advance {
        participant: ParticipantId,
        observed_length: usize,
        reply: Option<oneshot::Sender<Result<PlaybackCursor>>>,
    },
    Join {
        participant: ParticipantId,
    },
    Snapshot {
        reply: oneshot::Sender<Result<RoomSnapshot>>,
    },
}

/// A finished job, returned to the coordinator
#[derive(Debug)]
pub(crate) enum Completion {
    Appended {
        requester: ParticipantId,
        result: Result<AppendOutcome>,
    },
    Removed {
        source_id: String,
        result: Result<Option<RemoveOutcome>>,
    },
    Advanced {
        participant: ParticipantId,
        result: Result<PlaybackCursor>,
        reply: Option<oneshot::Sender<Result<PlaybackCursor>>>,
    },
    Joined {
        participant: ParticipantId,
        result: Result<RoomSnapshot>,
    },
    Snapshot {
        result: Result<RoomSnapshot>,
        reply: oneshot::Sender<Result<RoomSnapshot>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AppendOutcome {
    pub playlist: Vec<PlaylistEntry>,
    pub cursor: PlaybackCursor,
    /// The playlist was empty, so playback started at index 0
    pub started: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RemoveOutcome {
    pub playlist: Vec<PlaylistEntry>,
    pub cursor: PlaybackCursor,
}

/// Start the worker; it stops once the returned sender is dropped
pub(crate) fn spawn<S: PlaylistRepository>(
    store: S,
    inbox: mpsc::WeakSender<RoomEvent>,
) -> mpsc::UnboundedSender<StoreJob> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    tokio::task::spawn_blocking(move || {
        while let Some(job) = rx.blocking_recv() {
            let completion = run_job(&store, job);

            let Some(inbox) = inbox.upgrade() else {
                debug!("Coordinator gone, dropping store completion");
                break;
            };
            if inbox.blocking_send(RoomEvent::Completed(completion)).is_err() {
                debug!("Coordinator gone, dropping store completion");
                break;
            }
        }
        debug!("Store worker stopped");
    });

    tx
}

fn run_job<S: PlaylistRepository>(store: &S, job: StoreJob) -> Completion {
    let now = Utc::now();
    match job {
        StoreJob::Append {
            requester,
            descriptor,
        } => Completion::Appended {
            requester,
            result: append_video(store, descriptor, now),
        },
        StoreJob::Remove { source_id } => Completion::Removed {
            result: remove_video(store, &source_id),
            source_id,
        },
        StoreJob::Advance {
            participant,
            observed_length,
            reply,
        } => Completion::Advanced {
            participant,
            result: advance_cursor(store, observed_length, now),
            reply,
        },
        StoreJob::Join { participant } => Completion::Joined {
            participant,
            result: snapshot(store, now),
        },
        StoreJob::Snapshot { reply } => Completion::Snapshot {
            result: snapshot(store, now),
            reply,
        },
    }
}

/// Append a video; an empty playlist starts playing it immediately
#[instrument(skip(store, descriptor), fields(source_id = %descriptor.source_id))]
pub(crate) fn append_video<S: PlaylistRepository>(
    store: &S,
    descriptor: VideoDescriptor,
    now: DateTime<Utc>,
) -> Result<AppendOutcome> {
    let entry = descriptor.into_entry(now)?;

    store.atomically(|store| {
        let started = store.cursor()?.index.is_none();
        store.append_entry(&entry)?;
        if started {
            store.reset_cursor()?;
            store.set_start_time(now)?;
        }

        let playlist = store.list_entries()?;
        let cursor = store.cursor()?;
        assert_cursor_invariants(&cursor, playlist.len());

        Ok(AppendOutcome {
            playlist,
            cursor,
            started,
        })
    })
}

/// Remove a video, keeping the cursor on a valid entry.
///
/// Returns `None` when no entry has that source id.
#[instrument(skip(store))]
pub(crate) fn remove_video<S: PlaylistRepository>(
    store: &S,
    source_id: &str,
) -> Result<Option<RemoveOutcome>> {
    store.atomically(|store| {
        let before = store.cursor()?;
        let Some(position) = store.remove_entry(source_id)? else {
            return Ok(None);
        };

        let playlist = store.list_entries()?;
        let index = index_after_removal(before.index, position, playlist.len());
        if index != before.index {
            store.set_cursor(index)?;
        }

        let cursor = store.cursor()?;
        assert_cursor_invariants(&cursor, playlist.len());

        Ok(Some(RemoveOutcome { playlist, cursor }))
    })
}

/// Move the cursor to the next entry and restart its clock
#[instrument(skip(store))]
pub(crate) fn advance_cursor<S: PlaylistRepository>(
    store: &S,
    observed_length: usize,
    now: DateTime<Utc>,
) -> Result<PlaybackCursor> {
    store.atomically(|store| {
        let len = store.list_entries()?.len();
        let current = store.cursor()?;

        let cursor = match next_index(current.index, observed_length, len) {
            Some(index) => {
                store.set_cursor(Some(index))?;
                store.set_start_time(now)?;
                PlaybackCursor::at(index, now)
            }
            None => {
                store.set_cursor(None)?;
                PlaybackCursor::default()
            }
        };

        assert_cursor_invariants(&cursor, len);
        Ok(cursor)
    })
}

/// Playlist plus cursor, with the offset a joiner should seek to
pub(crate) fn snapshot<S: PlaylistRepository>(store: &S, now: DateTime<Utc>) -> Result<RoomSnapshot> {
    let videos = store.list_entries()?;
    let cursor = store.cursor()?;

    Ok(RoomSnapshot {
        elapsed_ms: cursor.elapsed_ms(now),
        videos,
        index: cursor.index,
        start: cursor.started_at,
    })
}

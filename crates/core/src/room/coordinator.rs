//! Room coordinator
//!
//! A single task owns the session registry and processes every room event
//! in arrival order, so room state needs no locks. Store work is handed to
//! the store worker and its results come back through the same inbox.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::notice::{ErrorPayload, RoomNotice, RoomRequest, RoomSnapshot};
use super::transport::Transport;
use super::worker::{self, Completion, StoreJob};
use crate::error::{Error, ErrorKind, Result};
use crate::hosting::SessionRegistry;
use crate::models::{ChatMessage, ParticipantId, PlaybackCursor, RoomPhase};
use crate::storage::PlaylistRepository;

/// Depth of the coordinator inbox
const EVENT_QUEUE_DEPTH: usize = 256;

/// Everything the coordinator reacts to
#[derive(Debug)]
pub(crate) enum RoomEvent {
    Connected {
        participant: ParticipantId,
    },
    Disconnected {
        participant: ParticipantId,
    },
    Request {
        participant: ParticipantId,
        request: RoomRequest,
    },
    Advance {
        participant: ParticipantId,
        observed_length: usize,
        reply: oneshot::Sender<Result<PlaybackCursor>>,
    },
    Snapshot {
        reply: oneshot::Sender<Result<RoomSnapshot>>,
    },
    Completed(Completion),
}

/// Cloneable handle for feeding events to a running coordinator
#[derive(Debug, Clone)]
pub struct RoomHandle {
    tx: mpsc::Sender<RoomEvent>,
}

impl RoomHandle {
    async fn send(&self, event: RoomEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| Error::RoomClosed)
    }

    /// A participant connected
    pub async fn connect(&self, participant: ParticipantId) -> Result<()> {
        self.send(RoomEvent::Connected { participant }).await
    }

    /// A participant disconnected
    pub async fn disconnect(&self, participant: ParticipantId) -> Result<()> {
        self.send(RoomEvent::Disconnected { participant }).await
    }

    /// A participant sent a request over the event channel
    pub async fn request(&self, participant: ParticipantId, request: RoomRequest) -> Result<()> {
        self.send(RoomEvent::Request {
            participant,
            request,
        })
        .await
    }

    /// Advance playback on behalf of `participant`, who must be host.
    ///
    /// Resolves once the new cursor has been stored and broadcast.
    pub async fn advance(
        &self,
        participant: ParticipantId,
        observed_length: usize,
    ) -> Result<PlaybackCursor> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomEvent::Advance {
            participant,
            observed_length,
            reply,
        })
        .await?;
        rx.await.map_err(|_| Error::RoomClosed)?
    }

    /// Current playlist and cursor.
    ///
    /// Every mutation requested before this call has been broadcast by the
    /// time it resolves.
    pub async fn snapshot(&self) -> Result<RoomSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomEvent::Snapshot { reply }).await?;
        rx.await.map_err(|_| Error::RoomClosed)?
    }
}

/// The room's protocol core
pub struct RoomCoordinator {
    registry: SessionRegistry,
    transport: Arc<dyn Transport>,
    jobs: mpsc::UnboundedSender<StoreJob>,
    playlist_len: usize,
    phase: RoomPhase,
}

impl RoomCoordinator {
    /// Start a coordinator and its store worker on the current runtime.
    ///
    /// Both stop once every [`RoomHandle`] has been dropped.
    pub fn spawn<S: PlaylistRepository>(store: S, transport: Arc<dyn Transport>) -> RoomHandle {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let jobs = worker::spawn(store, tx.downgrade());

        let coordinator = RoomCoordinator {
            registry: SessionRegistry::new(),
            transport,
            jobs,
            playlist_len: 0,
            phase: RoomPhase::Empty,
        };
        tokio::spawn(coordinator.run(rx));

        RoomHandle { tx }
    }

    async fn run(mut self, mut inbox: mpsc::Receiver<RoomEvent>) {
        info!("Room coordinator started");
        while let Some(event) = inbox.recv().await {
            self.handle(event).await;
            self.update_phase();
        }
        info!("Room coordinator stopped");
    }

    async fn handle(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::Connected { participant } => self.on_connect(participant).await,
            RoomEvent::Disconnected { participant } => self.on_disconnect(participant).await,
            RoomEvent::Request {
                participant,
                request,
            } => self.on_request(participant, request).await,
            RoomEvent::Advance {
                participant,
                observed_length,
                reply,
            } => self.request_advance(participant, observed_length, Some(reply)),
            RoomEvent::Snapshot { reply } => self.dispatch(StoreJob::Snapshot { reply }),
            RoomEvent::Completed(completion) => self.on_completion(completion).await,
        }
    }

    async fn on_connect(&mut self, participant: ParticipantId) {
        let outcome = self.registry.on_connect(participant);
        info!(
            participant = %participant,
            role = ?outcome.role,
            participants = self.registry.len(),
            "Participant connected"
        );

        self.transport
            .send_to(participant, RoomNotice::Welcome(participant))
            .await;
        if let Some(host) = outcome.promoted {
            self.transport.send_to(host, RoomNotice::Host).await;
        }

        self.dispatch(StoreJob::Join { participant });
    }

    async fn on_disconnect(&mut self, participant: ParticipantId) {
        let promoted = self.registry.on_disconnect(participant);
        info!(
            participant = %participant,
            participants = self.registry.len(),
            "Participant disconnected"
        );

        if let Some(host) = promoted {
            self.transport.send_to(host, RoomNotice::Host).await;
        }
    }

    async fn on_request(&mut self, participant: ParticipantId, request: RoomRequest) {
        match request {
            RoomRequest::SaveToPlaylist(descriptor) => {
                debug!(participant = %participant, source_id = %descriptor.source_id, "Append requested");
                self.dispatch(StoreJob::Append {
                    requester: participant,
                    descriptor,
                });
            }
            RoomRequest::RemoveFromPlaylist(source_id) => {
                debug!(participant = %participant, source_id = %source_id, "Removal requested");
                self.dispatch(StoreJob::Remove { source_id });
            }
            RoomRequest::EmitMessage(outgoing) => {
                let message = ChatMessage::from_outgoing(outgoing, Utc::now());
                self.transport
                    .broadcast(RoomNotice::PushingMessage(message))
                    .await;
            }
            RoomRequest::PlayNext { observed_length } => {
                self.request_advance(participant, observed_length, None);
            }
        }
    }

    /// Host identity is checked against the live registry, never the client
    fn request_advance(
        &mut self,
        participant: ParticipantId,
        observed_length: usize,
        reply: Option<oneshot::Sender<Result<PlaybackCursor>>>,
    ) {
        if !self.registry.is_host(participant) {
            warn!(participant = %participant, "Advance rejected: not host");
            if let Some(reply) = reply {
                let _ = reply.send(Err(Error::InvalidRequest(
                    "only the host can advance playback".into(),
                )));
            }
            return;
        }

        self.dispatch(StoreJob::Advance {
            participant,
            observed_length,
            reply,
        });
    }

    async fn on_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Appended { requester, result } => match result {
                Ok(outcome) => {
                    self.playlist_len = outcome.playlist.len();
                    self.transport
                        .broadcast(RoomNotice::RetrievePlaylist(outcome.playlist))
                        .await;
                    if outcome.started {
                        info!("Playlist started");
                        self.transport.broadcast(RoomNotice::PlayNext(0)).await;
                    }
                }
                Err(e) => self.report_failure(Some(requester), "append", &e).await,
            },
            Completion::Removed { source_id, result } => match result {
                Ok(Some(outcome)) => {
                    self.playlist_len = outcome.playlist.len();
                    let now_empty = outcome.playlist.is_empty();
                    self.transport
                        .broadcast(RoomNotice::RetrievePlaylist(outcome.playlist))
                        .await;
                    if now_empty {
                        self.transport.broadcast(RoomNotice::Default).await;
                    }
                }
                Ok(None) => debug!(source_id = %source_id, "Removal of unknown entry ignored"),
                Err(e) => self.report_failure(None, "remove", &e).await,
            },
            Completion::Advanced {
                participant,
                result,
                reply,
            } => {
                match &result {
                    Ok(cursor) => {
                        info!(participant = %participant, index = ?cursor.index, "Playback advanced");
                        let notice = match cursor.index {
                            Some(index) => RoomNotice::PlayNext(index),
                            None => RoomNotice::Default,
                        };
                        self.transport.broadcast(notice).await;
                    }
                    Err(e) => self.report_failure(None, "advance", e).await,
                }
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            Completion::Joined {
                participant,
                result,
            } => match result {
                Ok(snapshot) => {
                    self.playlist_len = snapshot.videos.len();
                    if self.registry.contains(participant) {
                        self.transport
                            .send_to(participant, RoomNotice::RoomState(snapshot))
                            .await;
                    } else {
                        debug!(participant = %participant, "Participant left before room state was ready");
                    }
                }
                Err(e) => {
                    error!(participant = %participant, error = %e, "Failed to load room state");
                    self.transport
                        .send_to(participant, RoomNotice::Error((&e).into()))
                        .await;
                }
            },
            Completion::Snapshot { result, reply } => {
                if let Ok(snapshot) = &result {
                    self.playlist_len = snapshot.videos.len();
                }
                let _ = reply.send(result);
            }
        }
    }

    /// Invalid requests go back to the requester only; adapter failures
    /// are broadcast to the room
    async fn report_failure(&self, requester: Option<ParticipantId>, operation: &str, e: &Error) {
        let payload = ErrorPayload::from(e);
        match (e.kind(), requester) {
            (ErrorKind::InvalidRequest, Some(requester)) => {
                warn!(operation, participant = %requester, error = %e, "Request rejected");
                self.transport
                    .send_to(requester, RoomNotice::Error(payload))
                    .await;
            }
            (ErrorKind::InvalidRequest, None) => {
                warn!(operation, error = %e, "Request rejected");
            }
            (ErrorKind::AdapterFailure, _) => {
                error!(operation, error = %e, "Store operation failed");
                self.transport.broadcast(RoomNotice::Error(payload)).await;
            }
        }
    }

    fn dispatch(&self, job: StoreJob) {
        if self.jobs.send(job).is_err() {
            error!("Store worker is not running; job dropped");
        }
    }

    fn update_phase(&mut self) {
        let phase = RoomPhase::derive(self.registry.len(), self.playlist_len);
        if phase != self.phase {
            info!(from = ?self.phase, to = ?phase, "Room phase changed");
            self.phase = phase;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OutgoingChat, VideoDescriptor};
    use crate::room::transport::testing::{drain, wait_for, ChannelTransport, Delivery};
    use crate::storage::Database;
    use chrono::DateTime;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn video(source_id: &str) -> VideoDescriptor {
        VideoDescriptor {
            title: format!("Video {}", source_id),
            creator: "Creator".into(),
            source_id: source_id.into(),
            description: String::new(),
        }
    }

    fn start_room() -> (RoomHandle, UnboundedReceiver<Delivery>) {
        let (transport, rx) = ChannelTransport::new();
        let room = RoomCoordinator::spawn(Database::open_in_memory().unwrap(), Arc::new(transport));
        (room, rx)
    }

    fn is_host_for(participant: ParticipantId) -> impl Fn(&Delivery) -> bool {
        move |d| d.to == Some(participant) && d.notice == RoomNotice::Host
    }

    /// Two connected participants; the first is host
    async fn room_with_host() -> (RoomHandle, UnboundedReceiver<Delivery>, ParticipantId, ParticipantId) {
        let (room, mut rx) = start_room();
        let [a, b] = [ParticipantId::new(), ParticipantId::new()];
        room.connect(a).await.unwrap();
        room.connect(b).await.unwrap();
        wait_for(&mut rx, is_host_for(a)).await;
        room.snapshot().await.unwrap();
        drain(&mut rx);
        (room, rx, a, b)
    }

    #[tokio::test]
    async fn test_second_joiner_makes_first_host_then_failover() {
        let (room, mut rx) = start_room();
        let [a, b] = [ParticipantId::new(), ParticipantId::new()];

        room.connect(a).await.unwrap();
        room.connect(b).await.unwrap();
        wait_for(&mut rx, is_host_for(a)).await;

        room.disconnect(a).await.unwrap();
        wait_for(&mut rx, is_host_for(b)).await;

        // B was never told it was host before A left
        room.snapshot().await.unwrap();
        assert!(drain(&mut rx).iter().all(|d| d.notice != RoomNotice::Host));
    }

    #[tokio::test]
    async fn test_solo_participant_is_not_host() {
        let (room, mut rx) = start_room();
        let a = ParticipantId::new();
        room.connect(a).await.unwrap();
        room.snapshot().await.unwrap();

        let deliveries = drain(&mut rx);
        assert!(deliveries.iter().all(|d| d.notice != RoomNotice::Host));
        assert!(matches!(room.advance(a, 0).await, Err(Error::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_join_receives_welcome_and_live_state() {
        let (room, mut rx) = start_room();
        let a = ParticipantId::new();
        room.connect(a).await.unwrap();
        room.request(a, RoomRequest::SaveToPlaylist(video("e1")))
            .await
            .unwrap();
        room.snapshot().await.unwrap();
        drain(&mut rx);

        let late = ParticipantId::new();
        room.connect(late).await.unwrap();

        let welcome = wait_for(&mut rx, |d| d.to == Some(late)).await;
        assert_eq!(welcome.notice, RoomNotice::Welcome(late));

        let state = wait_for(&mut rx, |d| {
            d.to == Some(late) && matches!(d.notice, RoomNotice::RoomState(_))
        })
        .await;
        let RoomNotice::RoomState(snapshot) = state.notice else {
            unreachable!()
        };
        assert_eq!(snapshot.videos.len(), 1);
        assert_eq!(snapshot.index, Some(0));
        assert!(snapshot.start.is_some());
    }

    #[tokio::test]
    async fn test_first_append_broadcasts_playlist_then_play_next() {
        let (room, mut rx, a, _b) = room_with_host().await;
        let before: DateTime<Utc> = Utc::now();

        room.request(a, RoomRequest::SaveToPlaylist(video("e1")))
            .await
            .unwrap();

        let playlist = wait_for(&mut rx, |d| matches!(d.notice, RoomNotice::RetrievePlaylist(_))).await;
        assert_eq!(playlist.to, None);
        let RoomNotice::RetrievePlaylist(entries) = playlist.notice else {
            unreachable!()
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source_id, "e1");

        let next = rx.recv().await.unwrap();
        assert_eq!(next, Delivery { to: None, notice: RoomNotice::PlayNext(0) });

        let snapshot = room.snapshot().await.unwrap();
        assert_eq!(snapshot.index, Some(0));
        assert!(snapshot.start.unwrap() >= before);
    }

    #[tokio::test]
    async fn test_append_to_non_empty_only_broadcasts_playlist() {
        let (room, mut rx, a, _b) = room_with_host().await;
        room.request(a, RoomRequest::SaveToPlaylist(video("e1")))
            .await
            .unwrap();
        room.snapshot().await.unwrap();
        drain(&mut rx);

        room.request(a, RoomRequest::SaveToPlaylist(video("e2")))
            .await
            .unwrap();
        room.snapshot().await.unwrap();

        let deliveries = drain(&mut rx);
        assert_eq!(deliveries.len(), 1);
        assert!(matches!(&deliveries[0].notice, RoomNotice::RetrievePlaylist(v) if v.len() == 2));
    }

    #[tokio::test]
    async fn test_duplicate_append_rejected_to_requester_only() {
        let (room, mut rx, a, b) = room_with_host().await;
        room.request(a, RoomRequest::SaveToPlaylist(video("e1")))
            .await
            .unwrap();
        room.snapshot().await.unwrap();
        drain(&mut rx);

        room.request(b, RoomRequest::SaveToPlaylist(video("e1")))
            .await
            .unwrap();
        room.snapshot().await.unwrap();

        let deliveries = drain(&mut rx);
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].to, Some(b));
        assert!(matches!(
            &deliveries[0].notice,
            RoomNotice::Error(p) if p.kind == ErrorKind::InvalidRequest
        ));
    }

    #[tokio::test]
    async fn test_removing_last_entry_goes_idle() {
        let (room, mut rx, a, _b) = room_with_host().await;
        room.request(a, RoomRequest::SaveToPlaylist(video("e1")))
            .await
            .unwrap();
        room.snapshot().await.unwrap();
        drain(&mut rx);

        room.request(a, RoomRequest::RemoveFromPlaylist("e1".into()))
            .await
            .unwrap();
        room.snapshot().await.unwrap();

        let notices: Vec<_> = drain(&mut rx).into_iter().map(|d| d.notice).collect();
        assert_eq!(
            notices,
            vec![RoomNotice::RetrievePlaylist(Vec::new()), RoomNotice::Default]
        );
        assert_eq!(room.snapshot().await.unwrap().index, None);
    }

    #[tokio::test]
    async fn test_removing_middle_entry_only_broadcasts_playlist() {
        let (room, mut rx, a, _b) = room_with_host().await;
        for id in ["e1", "e2", "e3"] {
            room.request(a, RoomRequest::SaveToPlaylist(video(id)))
                .await
                .unwrap();
        }
        room.snapshot().await.unwrap();
        drain(&mut rx);

        room.request(a, RoomRequest::RemoveFromPlaylist("e2".into()))
            .await
            .unwrap();
        room.snapshot().await.unwrap();

        let deliveries = drain(&mut rx);
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].to, None);
        let RoomNotice::RetrievePlaylist(entries) = &deliveries[0].notice else {
            panic!("expected playlist, got {:?}", deliveries[0].notice);
        };
        let ids: Vec<_> = entries.iter().map(|e| e.source_id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "e3"]);
    }

    #[tokio::test]
    async fn test_host_advance_wraps_at_end() {
        let (room, mut rx, a, _b) = room_with_host().await;
        for id in ["e1", "e2"] {
            room.request(a, RoomRequest::SaveToPlaylist(video(id)))
                .await
                .unwrap();
        }
        room.advance(a, 2).await.unwrap();
        let at_last = room.snapshot().await.unwrap();
        assert_eq!(at_last.index, Some(1));
        drain(&mut rx);

        let cursor = room.advance(a, 2).await.unwrap();
        assert_eq!(cursor.index, Some(0));
        assert!(cursor.started_at >= at_last.start);

        let notices: Vec<_> = drain(&mut rx).into_iter().map(|d| d.notice).collect();
        assert_eq!(notices, vec![RoomNotice::PlayNext(0)]);
    }

    #[tokio::test]
    async fn test_member_advance_rejected_without_broadcast() {
        let (room, mut rx, a, b) = room_with_host().await;
        room.request(a, RoomRequest::SaveToPlaylist(video("e1")))
            .await
            .unwrap();
        room.request(a, RoomRequest::SaveToPlaylist(video("e2")))
            .await
            .unwrap();
        room.snapshot().await.unwrap();
        drain(&mut rx);

        assert!(matches!(room.advance(b, 2).await, Err(Error::InvalidRequest(_))));
        room.request(b, RoomRequest::PlayNext { observed_length: 2 })
            .await
            .unwrap();

        assert_eq!(room.snapshot().await.unwrap().index, Some(0));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_advance_over_event_channel() {
        let (room, mut rx, a, _b) = room_with_host().await;
        for id in ["e1", "e2", "e3"] {
            room.request(a, RoomRequest::SaveToPlaylist(video(id)))
                .await
                .unwrap();
        }
        room.snapshot().await.unwrap();
        drain(&mut rx);

        room.request(a, RoomRequest::PlayNext { observed_length: 3 })
            .await
            .unwrap();
        let next = wait_for(&mut rx, |d| matches!(d.notice, RoomNotice::PlayNext(_))).await;
        assert_eq!(next.notice, RoomNotice::PlayNext(1));
    }

    #[tokio::test]
    async fn test_departed_host_loses_authority_with_advance_in_flight() {
        let (room, mut rx, a, b) = room_with_host().await;
        for id in ["e1", "e2", "e3"] {
            room.request(a, RoomRequest::SaveToPlaylist(video(id)))
                .await
                .unwrap();
        }

        // Accepted while A is still host; applied after A has left
        room.request(a, RoomRequest::PlayNext { observed_length: 3 })
            .await
            .unwrap();
        room.disconnect(a).await.unwrap();
        wait_for(&mut rx, is_host_for(b)).await;

        assert!(matches!(room.advance(a, 3).await, Err(Error::InvalidRequest(_))));
        assert_eq!(room.snapshot().await.unwrap().index, Some(1));

        let cursor = room.advance(b, 3).await.unwrap();
        assert_eq!(cursor.index, Some(2));
    }

    #[tokio::test]
    async fn test_promoted_host_can_advance() {
        let (room, _rx, a, b) = room_with_host().await;
        room.request(a, RoomRequest::SaveToPlaylist(video("e1")))
            .await
            .unwrap();
        room.disconnect(a).await.unwrap();

        let cursor = room.advance(b, 1).await.unwrap();
        assert_eq!(cursor.index, Some(0));
    }

    #[tokio::test]
    async fn test_chat_broadcast_with_color() {
        let (room, mut rx, a, _b) = room_with_host().await;
        room.request(
            a,
            RoomRequest::EmitMessage(OutgoingChat {
                body: "hello".into(),
                author_name: "Bob".into(),
                timestamp: None,
            }),
        )
        .await
        .unwrap();

        let delivery = wait_for(&mut rx, |d| matches!(d.notice, RoomNotice::PushingMessage(_))).await;
        assert_eq!(delivery.to, None);
        let RoomNotice::PushingMessage(message) = delivery.notice else {
            unreachable!()
        };
        assert_eq!(message.color, "#e8baff");
        assert_eq!(message.body, "hello");
    }

    /// Store whose writes always fail
    struct BrokenStore(Database);

    impl PlaylistRepository for BrokenStore {
        fn list_entries(&self) -> Result<Vec<crate::models::PlaylistEntry>> {
            self.0.list_entries()
        }

        fn append_entry(&self, _entry: &crate::models::PlaylistEntry) -> Result<()> {
            Err(Error::Adapter("disk full".into()))
        }

        fn remove_entry(&self, _source_id: &str) -> Result<Option<usize>> {
            Err(Error::Adapter("disk full".into()))
        }

        fn cursor(&self) -> Result<PlaybackCursor> {
            self.0.cursor()
        }

        fn set_cursor(&self, _index: Option<usize>) -> Result<()> {
            Err(Error::Adapter("disk full".into()))
        }

        fn set_start_time(&self, _at: DateTime<Utc>) -> Result<()> {
            Err(Error::Adapter("disk full".into()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_broadcasts_error_only() {
        let (transport, mut rx) = ChannelTransport::new();
        let store = BrokenStore(Database::open_in_memory().unwrap());
        let room = RoomCoordinator::spawn(store, Arc::new(transport));

        let a = ParticipantId::new();
        room.connect(a).await.unwrap();
        room.snapshot().await.unwrap();
        drain(&mut rx);

        room.request(a, RoomRequest::SaveToPlaylist(video("e1")))
            .await
            .unwrap();
        room.snapshot().await.unwrap();

        let deliveries = drain(&mut rx);
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].to, None);
        assert!(matches!(
            &deliveries[0].notice,
            RoomNotice::Error(p) if p.kind == ErrorKind::AdapterFailure
        ));
        assert!(room.snapshot().await.unwrap().videos.is_empty());

        // The room keeps serving other traffic
        room.request(
            a,
            RoomRequest::EmitMessage(OutgoingChat {
                body: "still here".into(),
                author_name: "Ann".into(),
                timestamp: None,
            }),
        )
        .await
        .unwrap();
        wait_for(&mut rx, |d| matches!(d.notice, RoomNotice::PushingMessage(_))).await;
    }

    /// A broken store over a database holding `ids`, with the cursor at 0
    fn broken_store_with(ids: &[&str]) -> BrokenStore {
        let db = Database::open_in_memory().unwrap();
        for id in ids {
            db.append_entry(&video(id).into_entry(Utc::now()).unwrap())
                .unwrap();
        }
        db.reset_cursor().unwrap();
        db.set_start_time(Utc::now()).unwrap();
        BrokenStore(db)
    }

    fn assert_single_adapter_error(deliveries: &[Delivery]) {
        assert_eq!(deliveries.len(), 1, "unexpected deliveries: {:?}", deliveries);
        assert_eq!(deliveries[0].to, None);
        assert!(matches!(
            &deliveries[0].notice,
            RoomNotice::Error(p) if p.kind == ErrorKind::AdapterFailure
        ));
    }

    #[tokio::test]
    async fn test_remove_failure_broadcasts_error_only() {
        let (transport, mut rx) = ChannelTransport::new();
        let room = RoomCoordinator::spawn(broken_store_with(&["e1", "e2"]), Arc::new(transport));

        let a = ParticipantId::new();
        room.connect(a).await.unwrap();
        room.snapshot().await.unwrap();
        drain(&mut rx);

        room.request(a, RoomRequest::RemoveFromPlaylist("e1".into()))
            .await
            .unwrap();
        room.snapshot().await.unwrap();

        assert_single_adapter_error(&drain(&mut rx));
        assert_eq!(room.snapshot().await.unwrap().videos.len(), 2);
    }

    #[tokio::test]
    async fn test_advance_failure_broadcasts_error_only() {
        let (transport, mut rx) = ChannelTransport::new();
        let room = RoomCoordinator::spawn(broken_store_with(&["e1", "e2"]), Arc::new(transport));

        let [a, b] = [ParticipantId::new(), ParticipantId::new()];
        room.connect(a).await.unwrap();
        room.connect(b).await.unwrap();
        wait_for(&mut rx, is_host_for(a)).await;
        room.snapshot().await.unwrap();
        drain(&mut rx);

        assert!(matches!(room.advance(a, 2).await, Err(Error::Adapter(_))));
        room.snapshot().await.unwrap();

        assert_single_adapter_error(&drain(&mut rx));
        assert_eq!(room.snapshot().await.unwrap().index, Some(0));
    }
}

//! TCP server for the room
//!
//! Each accepted connection becomes a participant. Frames from the client
//! are forwarded to the room coordinator; room notices reach the client
//! through its queue in the [`PeerTable`].

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use famly_core::{ParticipantId, RoomHandle, RoomNotice, Transport};
use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, Notify, RwLock};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::Message;

/// Maximum number of connected peers
const MAX_PEERS: usize = 64;

/// Outbound messages buffered per peer before it counts as lagging
const PEER_QUEUE_DEPTH: usize = 64;

/// A connected peer's outbound queue
struct Peer {
    tx: mpsc::Sender<Message>,
    /// Signalled when the peer is evicted so its connection closes
    evicted: Arc<Notify>,
}

impl Peer {
    /// Queue a message without waiting. Returns false if the peer must go.
    fn offer(&self, participant: ParticipantId, msg: Message) -> bool {
        match self.tx.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(participant = %participant, "Peer queue full");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(participant = %participant, "Peer queue closed");
                false
            }
        }
    }
}

/// Outbound queues of connected peers. This is the room's transport.
///
/// A peer that cannot take a message is evicted and its connection closed
/// rather than left with a gap in its view of the room. It resyncs from the
/// `roomState` sent when it reconnects.
#[derive(Default)]
pub struct PeerTable {
    peers: RwLock<HashMap<ParticipantId, Peer>>,
}

impl PeerTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a peer unless the room is full
    async fn try_insert(&self, participant: ParticipantId, peer: Peer) -> bool {
        let mut peers = self.peers.write().await;
        if peers.len() >= MAX_PEERS {
            return false;
        }
        peers.insert(participant, peer);
        true
    }

    async fn remove(&self, participant: ParticipantId) {
        self.peers.write().await.remove(&participant);
    }

    /// Drop lagging peers and close their connections
    async fn evict(&self, lagging: Vec<ParticipantId>) {
        if lagging.is_empty() {
            return;
        }

        let mut peers = self.peers.write().await;
        for participant in lagging {
            if let Some(peer) = peers.remove(&participant) {
                warn!(participant = %participant, "Evicting peer that fell behind");
                peer.evicted.notify_one();
            }
        }
    }

    /// Number of connected peers
    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }

    /// Queue a raw message for every peer
    async fn send_all(&self, msg: Message) {
        let lagging: Vec<ParticipantId> = {
            let peers = self.peers.read().await;
            peers
                .iter()
                .filter(|(participant, peer)| !peer.offer(**participant, msg.clone()))
                .map(|(participant, _)| *participant)
                .collect()
        };
        self.evict(lagging).await;
    }
}

#[async_trait]
impl Transport for PeerTable {
    async fn send_to(&self, participant: ParticipantId, notice: RoomNotice) {
        let delivered = {
            let peers = self.peers.read().await;
            match peers.get(&participant) {
                Some(peer) => peer.offer(participant, Message::Notice(notice)),
                None => {
                    debug!(participant = %participant, "No connection for participant");
                    true
                }
            }
        };
        if !delivered {
            self.evict(vec![participant]).await;
        }
    }

    async fn broadcast(&self, notice: RoomNotice) {
        self.send_all(Message::Notice(notice)).await;
    }
}

/// Room server handle
pub struct Server {
    addr: SocketAddr,
    peers: Arc<PeerTable>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind `addr` and start accepting participants for `room`.
    ///
    /// `peers` must be the transport the room coordinator was spawned with.
    pub async fn start(addr: SocketAddr, room: RoomHandle, peers: Arc<PeerTable>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let bound_addr = listener.local_addr()?;

        info!(addr = %bound_addr, "Room server started");

        let (shutdown_tx, _) = broadcast::channel(1);
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(accept_loop(listener, room, peers.clone(), shutdown_rx));

        Ok(Server {
            addr: bound_addr,
            peers,
            shutdown_tx,
        })
    }

    /// Get the server's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Number of connected peers
    pub async fn peer_count(&self) -> usize {
        self.peers.len().await
    }

    /// Tell peers the server is going away and stop accepting
    pub async fn shutdown(&self) {
        self.peers.send_all(Message::ServerShutdown).await;
        let _ = self.shutdown_tx.send(());
        info!("Server shutdown initiated");
    }
}

/// Accept incoming connections
async fn accept_loop(
    listener: TcpListener,
    room: RoomHandle,
    peers: Arc<PeerTable>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(addr = %addr, "New connection");
                        tokio::spawn(handle_connection(stream, addr, room.clone(), peers.clone()));
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop shutting down");
                break;
            }
        }
    }
}

/// Handle a single participant connection
async fn handle_connection(stream: TcpStream, addr: SocketAddr, room: RoomHandle, peers: Arc<PeerTable>) {
    let (mut reader, mut writer) = tokio::io::split(stream);

    let participant = ParticipantId::new();
    let (tx, rx) = mpsc::channel(PEER_QUEUE_DEPTH);
    let evicted = Arc::new(Notify::new());
    let peer = Peer {
        tx: tx.clone(),
        evicted: evicted.clone(),
    };

    if !peers.try_insert(participant, peer).await {
        warn!(addr = %addr, "Room full, rejecting connection");
        let reject = Message::Rejected {
            reason: "room is full".into(),
        };
        let _ = write_frame(&mut writer, &reject).await;
        return;
    }

    let writer_handle = tokio::spawn(writer_task(writer, rx));

    if let Err(e) = room.connect(participant).await {
        error!(participant = %participant, error = %e, "Room unavailable");
        peers.remove(participant).await;
        writer_handle.abort();
        return;
    }

    info!(addr = %addr, participant = %participant, "Participant joined");

    tokio::select! {
        result = read_loop(&mut reader, participant, &room, &tx) => match result {
            Ok(()) | Err(Error::ConnectionClosed) => {
                debug!(participant = %participant, "Connection closed");
            }
            Err(e) => {
                warn!(participant = %participant, error = %e, "Read error");
            }
        },
        _ = evicted.notified() => {
            info!(participant = %participant, "Closing connection of evicted peer");
        }
    }

    // Cleanup
    peers.remove(participant).await;
    writer_handle.abort();
    if let Err(e) = room.disconnect(participant).await {
        debug!(participant = %participant, error = %e, "Room gone before disconnect");
    }

    info!(participant = %participant, "Participant disconnected");
}

/// Forward client frames to the room until the connection ends
async fn read_loop(
    reader: &mut ReadHalf<TcpStream>,
    participant: ParticipantId,
    room: &RoomHandle,
    tx: &mpsc::Sender<Message>,
) -> Result<()> {
    loop {
        match read_frame(reader).await? {
            Message::Request(request) => room.request(participant, request).await?,
            Message::Ping => {
                if tx.try_send(Message::Pong).is_err() {
                    debug!(participant = %participant, "Dropping pong for busy peer");
                }
            }
            other => {
                debug!(participant = %participant, message = ?other, "Ignoring unexpected message type");
            }
        }
    }
}

/// Writer task - sends messages to the client
async fn writer_task(mut writer: WriteHalf<TcpStream>, mut rx: mpsc::Receiver<Message>) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &msg).await {
            debug!(error = %e, "Write failed");
            break;
        }
    }
}

//! TCP client for joining a room

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use famly_core::{
    OutgoingChat, ParticipantId, PlaylistEntry, RoomNotice, RoomRequest, VideoDescriptor,
};
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::Message;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Client handle for network operations
pub struct Client {
    participant: ParticipantId,
    state: Arc<RwLock<ClientState>>,
    event_rx: mpsc::Receiver<RoomNotice>,
    cmd_tx: mpsc::Sender<ClientCommand>,
}

/// What the client has learned from room notices
struct ClientState {
    connection: ConnectionState,
    is_host: bool,
    playlist: Vec<PlaylistEntry>,
    current_index: Option<usize>,
    last_pong: Option<Instant>,
}

impl ClientState {
    fn apply(&mut self, notice: &RoomNotice) {
        match notice {
            RoomNotice::Host => self.is_host = true,
            RoomNotice::RoomState(snapshot) => {
                self.playlist = snapshot.videos.clone();
                self.current_index = snapshot.index;
            }
            RoomNotice::RetrievePlaylist(entries) => self.playlist = entries.clone(),
            RoomNotice::PlayNext(index) => self.current_index = Some(*index),
            RoomNotice::Default => self.current_index = None,
            RoomNotice::Welcome(_) | RoomNotice::PushingMessage(_) | RoomNotice::Error(_) => {}
        }
    }
}

enum ClientCommand {
    Send(Message),
    Disconnect,
}

impl Client {
    /// Connect to a room server and wait for the room to assign an identity
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        info!(addr = %addr, "Connecting to room");

        let stream = TcpStream::connect(addr).await?;
        let (mut reader, writer) = tokio::io::split(stream);

        // Broadcasts can arrive before the welcome; keep them in order
        let mut early = Vec::new();
        let participant = loop {
            match read_frame(&mut reader).await? {
                Message::Notice(RoomNotice::Welcome(participant)) => break participant,
                Message::Notice(notice) => early.push(notice),
                Message::Rejected { reason } => {
                    warn!(reason = %reason, "Connection rejected");
                    return Err(Error::Rejected(reason));
                }
                Message::ServerShutdown => return Err(Error::ConnectionClosed),
                other => debug!(message = ?other, "Ignoring message before welcome"),
            }
        };

        let mut state = ClientState {
            connection: ConnectionState::Connected,
            is_host: false,
            playlist: Vec::new(),
            current_index: None,
            last_pong: None,
        };
        for notice in &early {
            state.apply(notice);
        }
        let state = Arc::new(RwLock::new(state));

        let (event_tx, event_rx) = mpsc::channel(64 + early.len());
        for notice in early {
            let _ = event_tx.try_send(notice);
        }
        let (cmd_tx, cmd_rx) = mpsc::channel(64);

        tokio::spawn(reader_task(reader, state.clone(), event_tx));
        tokio::spawn(writer_task(writer, cmd_rx));

        info!(participant = %participant, "Joined room");

        Ok(Client {
            participant,
            state,
            event_rx,
            cmd_tx,
        })
    }

    /// Identity the room assigned to this connection
    pub fn participant_id(&self) -> ParticipantId {
        self.participant
    }

    /// Get the next room notice; `None` once the connection is gone
    pub async fn next_event(&mut self) -> Option<RoomNotice> {
        self.event_rx.recv().await
    }

    async fn send(&self, msg: Message) -> Result<()> {
        self.cmd_tx
            .send(ClientCommand::Send(msg))
            .await
            .map_err(|_| Error::NotConnected)
    }

    /// Send a room request
    pub async fn request(&self, request: RoomRequest) -> Result<()> {
        self.send(Message::Request(request)).await
    }

    pub async fn save_to_playlist(&self, video: VideoDescriptor) -> Result<()> {
        self.request(RoomRequest::SaveToPlaylist(video)).await
    }

    pub async fn remove_from_playlist(&self, source_id: impl Into<String>) -> Result<()> {
        self.request(RoomRequest::RemoveFromPlaylist(source_id.into()))
            .await
    }

    /// Post a chat message; the server stamps the time
    pub async fn emit_message(&self, author_name: &str, body: &str) -> Result<()> {
        self.request(RoomRequest::EmitMessage(OutgoingChat {
            body: body.to_string(),
            author_name: author_name.to_string(),
            timestamp: None,
        }))
        .await
    }

    /// Ask the room to advance. Only honored when this client is host.
    pub async fn play_next(&self) -> Result<()> {
        let observed_length = self.state.read().await.playlist.len();
        self.request(RoomRequest::PlayNext { observed_length })
            .await
    }

    /// Send a ping
    pub async fn ping(&self) -> Result<()> {
        self.send(Message::Ping).await
    }

    /// Disconnect from the server
    pub async fn disconnect(&self) {
        let _ = self.cmd_tx.send(ClientCommand::Disconnect).await;
    }

    /// Get current connection state
    pub async fn connection_state(&self) -> ConnectionState {
        self.state.read().await.connection
    }

    /// Whether the room has told this client it is host
    pub async fn is_host(&self) -> bool {
        self.state.read().await.is_host
    }

    /// Last playlist seen from the room
    pub async fn playlist(&self) -> Vec<PlaylistEntry> {
        self.state.read().await.playlist.clone()
    }

    /// Index of the entry playing, as last announced
    pub async fn current_index(&self) -> Option<usize> {
        self.state.read().await.current_index
    }

    /// When the last pong arrived
    pub async fn last_pong(&self) -> Option<Instant> {
        self.state.read().await.last_pong
    }
}

/// Reads frames, updates local state, and forwards notices
async fn reader_task(
    mut reader: ReadHalf<TcpStream>,
    state: Arc<RwLock<ClientState>>,
    event_tx: mpsc::Sender<RoomNotice>,
) {
    loop {
        match read_frame(&mut reader).await {
            Ok(Message::Notice(notice)) => {
                state.write().await.apply(&notice);
                if event_tx.send(notice).await.is_err() {
                    debug!("Client handle dropped");
                    break;
                }
            }
            Ok(Message::Pong) => {
                debug!("Received pong");
                state.write().await.last_pong = Some(Instant::now());
            }
            Ok(Message::ServerShutdown) => {
                info!("Server is shutting down");
                break;
            }
            Ok(other) => debug!(message = ?other, "Ignoring unexpected message"),
            Err(Error::ConnectionClosed) => {
                debug!("Server closed connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Read error");
                break;
            }
        }
    }

    state.write().await.connection = ConnectionState::Disconnected;
    info!("Disconnected from room");
}

/// Writes queued commands until asked to stop
async fn writer_task(mut writer: WriteHalf<TcpStream>, mut cmd_rx: mpsc::Receiver<ClientCommand>) {
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            ClientCommand::Send(msg) => {
                if let Err(e) = write_frame(&mut writer, &msg).await {
                    warn!(error = %e, "Write error");
                    break;
                }
            }
            ClientCommand::Disconnect => {
                debug!("Disconnect requested");
                break;
            }
        }
    }

    let _ = writer.shutdown().await;
}

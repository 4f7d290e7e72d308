//! Connection bookkeeping for the multiplayer server
//!
//! This module tracks live connections independently of player state:
//! - Session lifecycle (connect, disconnect, timeout)
//! - Address-to-session resolution for inbound datagrams
//! - The session-scoped admin flag (never persisted, lost on reconnect)
//! - Capacity enforcement and activity monitoring
//!
//! A session exists from the moment a `Connect` handshake is accepted; the
//! player record is created separately when the session sends `Init`.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Sessions silent for longer than this are swept by the timeout checker.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(30);

/// One live connection and its session-scoped flags.
#[derive(Debug)]
pub struct Session {
    /// Unique session identifier assigned by the server
    pub id: u32,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this session
    pub last_seen: Instant,
    /// Admin privilege granted by `/login`; never survives a reconnect
    pub is_admin: bool,
}

impl Session {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            is_admin: false,
        }
    }

    /// Marks the session as recently active.
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all live sessions and enforces the server capacity limit.
///
/// Session ids start from 1 and increment for each accepted connection; an
/// id freed by a disconnect is never recycled into a live session.
pub struct SessionManager {
    sessions: HashMap<u32, Session>,
    next_session_id: u32,
    max_sessions: usize,
}

impl SessionManager {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            next_session_id: 1,
            max_sessions,
        }
    }

    /// Attempts to register a new connection.
    ///
    /// Returns `Some(session_id)` on success, `None` when the server is at
    /// capacity.
    pub fn add_session(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.sessions.len() >= self.max_sessions {
            return None;
        }

        let session_id = self.next_session_id;
        self.next_session_id += 1;

        info!("Session {} connected from {}", session_id, addr);
        self.sessions.insert(session_id, Session::new(session_id, addr));

        Some(session_id)
    }

    /// Removes a session. Returns true if it was still present; false means
    /// it was already gone (idempotent for the disconnect/timeout race).
    pub fn remove_session(&mut self, session_id: &u32) -> bool {
        if let Some(session) = self.sessions.remove(session_id) {
            info!("Session {} disconnected", session.id);
            true
        } else {
            false
        }
    }

    /// Resolves an inbound datagram's source address to a session id.
    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.sessions
            .iter()
            .find(|(_, session)| session.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn addr_of(&self, session_id: u32) -> Option<SocketAddr> {
        self.sessions.get(&session_id).map(|session| session.addr)
    }

    /// Refreshes the activity timestamp for a session, if it still exists.
    pub fn touch(&mut self, session_id: u32) {
        if let Some(session) = self.sessions.get_mut(&session_id) {
            session.touch();
        }
    }

    pub fn set_admin(&mut self, session_id: u32, is_admin: bool) {
        if let Some(session) = self.sessions.get_mut(&session_id) {
            session.is_admin = is_admin;
        }
    }

    pub fn is_admin(&self, session_id: u32) -> bool {
        self.sessions
            .get(&session_id)
            .map(|session| session.is_admin)
            .unwrap_or(false)
    }

    /// Removes and returns sessions that have gone silent past the timeout.
    pub fn check_timeouts(&mut self) -> Vec<u32> {
        let timed_out: Vec<u32> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.is_timed_out(SESSION_TIMEOUT))
            .map(|(id, _)| *id)
            .collect();

        for session_id in &timed_out {
            self.remove_session(session_id);
        }

        timed_out
    }

    /// All session ids and addresses, for broadcast fan-out.
    pub fn session_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.sessions
            .iter()
            .map(|(id, session)| (*id, session.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

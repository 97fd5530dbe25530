//! Per-player state and score bookkeeping.

use tiltball_shared::PlayerId;

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    /// Match-aggregate score. Accumulated only by the authoritative side.
    pub score: u32,
    /// Score of the round in progress; zeroed when the ball drains.
    pub current_score: u32,
    /// Running maximum of `current_score` over the session.
    pub high_score: u32,
    pub is_me: bool,
    pub is_opponent: bool,
    /// When set, this player's kinematics come from snapshot restoration
    /// only and local prediction must not touch them.
    pub is_server_controlled: bool,
    /// Estimated transport latency, ms.
    pub latency: f64,
}

impl Player {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            score: 0,
            current_score: 0,
            high_score: 0,
            is_me: false,
            is_opponent: true,
            is_server_controlled: false,
            latency: 0.0,
        }
    }

    pub fn set_server_controlled(&mut self, state: bool) {
        self.is_server_controlled = state;
    }

    pub fn set_latency(&mut self, latency: f64) {
        self.latency = latency;
    }

    /// Add round points. The high score tracks the running max
    /// continuously, not just at round end.
    pub fn add_points(&mut self, points: u32) {
        self.current_score += points;
        self.high_score = self.high_score.max(self.current_score);
    }

    /// Add to the match-aggregate score (authoritative side only).
    pub fn add_match_points(&mut self, points: u32) {
        self.score += points;
    }

    pub fn reset_current_score(&mut self) {
        self.current_score = 0;
    }
}

//! Spoiler protection for the standings panel.
//!
//! The viewer reveals the standings with a tap. The reveal is remembered as
//! the fingerprint that was on screen at the time, so it lapses the moment
//! the standings change. The embedded page script applies the same rule.

/// Cookie holding the fingerprint the viewer last revealed.
pub const REVEAL_COOKIE: &str = "paddock_revealed";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevealState {
    revealed: Option<String>,
}

impl RevealState {
    pub fn new(revealed: Option<String>) -> Self {
        Self {
            revealed: revealed.filter(|f| !f.is_empty()),
        }
    }

    /// Read the reveal cookie out of a `Cookie` request header value.
    pub fn from_cookie_header(header: Option<&str>) -> Self {
        let revealed = header.and_then(|h| {
            h.split(';').find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name == REVEAL_COOKIE).then(|| value.trim().to_string())
            })
        });
        Self::new(revealed)
    }

    pub fn revealed_fingerprint(&self) -> Option<&str> {
        self.revealed.as_deref()
    }

    /// Standings are shown only if the viewer revealed exactly this fingerprint.
    pub fn is_revealed(&self, current: &str) -> bool {
        self.revealed.as_deref() == Some(current)
    }

    pub fn should_blur(&self, current: &str) -> bool {
        !self.is_revealed(current)
    }

    /// The viewer tapped to reveal the standings currently shown.
    pub fn reveal(&mut self, current: &str) {
        self.revealed = Some(current.to_string());
    }

    /// The viewer tapped to hide the standings again.
    pub fn hide(&mut self) {
        self.revealed = None;
    }

    /// New data arrived. Drops the reveal if the fingerprint moved; returns
    /// true when the panel has to be re-blurred.
    pub fn observe(&mut self, current: &str) -> bool {
        match self.revealed.as_deref() {
            Some(revealed) if revealed != current => {
                self.revealed = None;
                true
            }
            _ => false,
        }
    }
}

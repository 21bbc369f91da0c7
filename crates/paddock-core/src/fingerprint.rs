//! Standings fingerprint.
//!
//! A short digest of championship order and points. The web view compares
//! it against the fingerprint the viewer last revealed to decide whether the
//! standings must be blurred again.

use std::fmt::Write;

use sha2::{Digest, Sha256};

use crate::models::{StandingEntry, Standings};

/// Hex characters kept from the SHA-256 digest.
const FINGERPRINT_LEN: usize = 16;

/// Compute the fingerprint of a pair of standings lists.
///
/// Only rank, name and points take part; a driver's team is display data.
pub fn standings_fingerprint(standings: &Standings) -> String {
    let mut canonical = String::new();
    write_section(&mut canonical, "D", &standings.drivers);
    write_section(&mut canonical, "C", &standings.constructors);

    let digest = Sha256::digest(canonical.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(FINGERPRINT_LEN);
    encoded
}

fn write_section(out: &mut String, tag: &str, entries: &[StandingEntry]) {
    for entry in entries {
        // Writing to a String cannot fail
        let _ = writeln!(out, "{}|{}|{}|{}", tag, entry.rank, entry.name, entry.points);
    }
    let _ = writeln!(out, "{}|end", tag);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(rank: u32, name: &str, points: f64) -> StandingEntry {
        StandingEntry {
            rank,
            name: name.to_string(),
            points,
            team: None,
        }
    }

    fn sample() -> Standings {
        Standings {
            drivers: vec![
                entry(1, "Oscar Piastri", 99.0),
                entry(2, "Lando Norris", 89.0),
                entry(3, "Max Verstappen", 87.0),
            ],
            constructors: vec![
                entry(1, "McLaren", 188.0),
                entry(2, "Mercedes", 111.0),
                entry(3, "Red Bull", 89.0),
            ],
        }
    }

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(standings_fingerprint(&sample()), standings_fingerprint(&sample()));
        assert_eq!(standings_fingerprint(&sample()).len(), FINGERPRINT_LEN);
    }

    #[test]
    fn test_fingerprint_changes_with_points() {
        let mut changed = sample();
        changed.drivers[2].points = 93.0;
        assert_ne!(standings_fingerprint(&sample()), standings_fingerprint(&changed));
    }

    #[test]
    fn test_fingerprint_changes_with_order() {
        let mut swapped = sample();
        swapped.constructors.swap(1, 2);
        swapped.constructors[1].rank = 2;
        swapped.constructors[2].rank = 3;
        assert_ne!(standings_fingerprint(&sample()), standings_fingerprint(&swapped));
    }

    #[test]
    fn test_fingerprint_ignores_team() {
        let mut with_team = sample();
        with_team.drivers[0].team = Some("McLaren".to_string());
        assert_eq!(standings_fingerprint(&sample()), standings_fingerprint(&with_team));
    }

    #[test]
    fn test_sections_do_not_alias() {
        let drivers_only = Standings {
            drivers: vec![entry(1, "McLaren", 10.0)],
            constructors: vec![],
        };
        let constructors_only = Standings {
            drivers: vec![],
            constructors: vec![entry(1, "McLaren", 10.0)],
        };
        assert_ne!(
            standings_fingerprint(&drivers_only),
            standings_fingerprint(&constructors_only)
        );
    }

    #[test]
    fn test_empty_standings_have_fingerprint() {
        let empty = standings_fingerprint(&Standings::default());
        assert_eq!(empty.len(), FINGERPRINT_LEN);
        assert_ne!(empty, standings_fingerprint(&sample()));
    }
}

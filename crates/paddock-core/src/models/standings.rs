use serde::{Deserialize, Serialize};

/// Number of places shown per championship.
pub const STANDINGS_DEPTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingEntry {
    pub rank: u32,
    pub name: String,
    pub points: f64,
    /// Team of a driver entry; absent on constructor entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
}

impl StandingEntry {
    /// Points without a trailing ".0" for whole numbers.
    pub fn points_display(&self) -> String {
        if self.points.fract() == 0.0 {
            format!("{}", self.points as i64)
        } else {
            format!("{}", self.points)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Standings {
    #[serde(default)]
    pub drivers: Vec<StandingEntry>,
    #[serde(default)]
    pub constructors: Vec<StandingEntry>,
}

impl Standings {
    /// Keep the top entries of each championship, ordered by rank.
    pub fn top(mut drivers: Vec<StandingEntry>, mut constructors: Vec<StandingEntry>) -> Self {
        drivers.sort_by_key(|e| e.rank);
        constructors.sort_by_key(|e| e.rank);
        drivers.truncate(STANDINGS_DEPTH);
        constructors.truncate(STANDINGS_DEPTH);
        Self { drivers, constructors }
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty() && self.constructors.is_empty()
    }
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

    #[test]
    fn test_top_sorts_and_truncates() {
        let drivers = vec![
            entry(4, "Russell", 40.0),
            entry(2, "Norris", 89.0),
            entry(1, "Piastri", 99.0),
            entry(3, "Verstappen", 87.0),
        ];
        let standings = Standings::top(drivers, vec![]);
        let names: Vec<_> = standings.drivers.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Piastri", "Norris", "Verstappen"]);
        assert!(standings.constructors.is_empty());
        assert!(!standings.is_empty());
    }

    #[test]
    fn test_points_display() {
        assert_eq!(entry(1, "A", 25.0).points_display(), "25");
        assert_eq!(entry(1, "A", 12.5).points_display(), "12.5");
    }
}

use serde::Serialize;

use crate::level::{LevelTable, LevelThreshold};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelProgress {
    pub xp: i64,
    pub current: LevelThreshold,
    pub next: Option<LevelThreshold>,
    /// 0..=100
    pub percent: u8,
    pub remaining: i64,
}

impl LevelProgress {
    pub fn is_max_level(&self) -> bool {
        self.next.is_none()
    }

    /// XP the next band starts at, or the current band's start at max level.
    pub fn next_level_xp(&self) -> i64 {
        self.next
            .as_ref()
            .map_or(self.current.min_xp, |next| next.min_xp)
    }
}

pub fn progress(xp: i64, table: &LevelTable) -> LevelProgress {
    let current = table.threshold_for(xp).clone();
    let next = table.next_after(xp).cloned();

    let (percent, remaining) = match &next {
        None => (100, 0),
        Some(next) => {
            // strictly increasing table, so the span is positive
            let span = (next.min_xp - current.min_xp) as f64;
            let ratio = (xp - current.min_xp) as f64 / span;
            let percent = (ratio * 100.0).round().clamp(0.0, 100.0) as u8;
            (percent, (next.min_xp - xp).max(0))
        }
    };

    LevelProgress {
        xp,
        current,
        next,
        percent,
        remaining,
    }
}

pub fn level_progress(xp: i64, table: &LevelTable) -> u8 {
    progress(xp, table).percent
}

pub fn xp_to_next_level(xp: i64, table: &LevelTable) -> i64 {
    progress(xp, table).remaining
}

pub fn next_level_xp(xp: i64, table: &LevelTable) -> i64 {
    progress(xp, table).next_level_xp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LevelTable {
        LevelTable::new(vec![
            LevelThreshold::new("Yalqov", -100),
            LevelThreshold::new("Maymuncha", -1),
            LevelThreshold::new("Beginner", 0),
            LevelThreshold::new("Novice", 10),
            LevelThreshold::new("Junior", 20),
            LevelThreshold::new("Intermediate", 40),
        ])
        .unwrap()
    }

    #[test]
    fn halfway_through_a_band() {
        let table = table();
        assert_eq!(level_progress(30, &table), 50);
        assert_eq!(xp_to_next_level(30, &table), 10);
        assert_eq!(next_level_xp(30, &table), 40);
    }

    #[test]
    fn rounds_to_nearest_percent() {
        // 7 of 10 into Beginner -> Novice
        assert_eq!(level_progress(7, &table()), 70);
        // 1 of 20 into Junior -> Intermediate is 5%
        assert_eq!(level_progress(21, &table()), 5);
    }

    #[test]
    fn max_level_is_complete() {
        let snapshot = progress(1_000, &table());
        assert!(snapshot.is_max_level());
        assert_eq!(snapshot.percent, 100);
        assert_eq!(snapshot.remaining, 0);
        assert_eq!(snapshot.next_level_xp(), 40);
        assert_eq!(snapshot.current.name, "Intermediate");
    }

    #[test]
    fn below_the_floor_clamps_to_zero() {
        let snapshot = progress(-250, &table());
        assert_eq!(snapshot.current.name, "Yalqov");
        assert_eq!(snapshot.percent, 0);
        assert_eq!(snapshot.remaining, 249);
    }

    #[test]
    fn negative_band_progress() {
        // -50 sits in Yalqov (-100), next is Maymuncha (-1): 50 of 99
        let snapshot = progress(-50, &table());
        assert_eq!(snapshot.next.as_ref().map(|t| t.name.as_str()), Some("Maymuncha"));
        assert_eq!(snapshot.percent, 51);
        assert_eq!(snapshot.remaining, 49);
    }
}

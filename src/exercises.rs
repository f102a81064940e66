//! Mindfulness exercises suggested after a high reading.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

/// A short exercise shown alongside a stress alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Exercise {
    /// Display name.
    pub name: &'static str,
    /// Instructions.
    pub description: &'static str,
}

/// Fixed catalog of suggested exercises.
pub const CATALOG: [Exercise; 5] = [
    Exercise {
        name: "Deep Breathing",
        description: "Take a deep breath in for 4 seconds, hold it for 4 seconds, and then exhale for 6 seconds. Repeat for 5 cycles.",
    },
    Exercise {
        name: "Body Scan",
        description: "Close your eyes and slowly bring attention to different parts of your body, starting from your toes and working up to your head.",
    },
    Exercise {
        name: "5-4-3-2-1 Grounding",
        description: "Identify 5 things you can see, 4 things you can feel, 3 things you can hear, 2 things you can smell, and 1 thing you can taste.",
    },
    Exercise {
        name: "Gratitude Reflection",
        description: "Take 2 minutes to reflect on 3 things you're grateful for and why they are meaningful to you.",
    },
    Exercise {
        name: "Mindful Observation",
        description: "Choose an object nearby and focus on it for 1 minute. Observe its color, texture, shape, and any small details you've never noticed before.",
    },
];

/// Pick one exercise uniformly at random.
pub fn pick<R: Rng + ?Sized>(rng: &mut R) -> Exercise {
    // CATALOG is a non-empty const array.
    CATALOG.choose(rng).copied().unwrap_or(CATALOG[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn catalog_names_are_unique() {
        let names: HashSet<&str> = CATALOG.iter().map(|e| e.name).collect();
        assert_eq!(names.len(), CATALOG.len());
        assert!(CATALOG.iter().all(|e| !e.description.is_empty()));
    }

    #[test]
    fn pick_returns_catalog_entries_and_covers_all() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = HashSet::new();
        for _ in 0..500 {
            let exercise = pick(&mut rng);
            assert!(CATALOG.contains(&exercise));
            seen.insert(exercise.name);
        }
        assert_eq!(seen.len(), CATALOG.len());
    }
}

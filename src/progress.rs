//! Completion statistics and representative selection over a work snapshot.
//!
//! Every function here is pure: it re-derives its result from the curriculum and the snapshot it
//! is given, so there is nothing to invalidate when the catalog changes.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use log::debug;
use serde::Serialize;

use crate::curriculum::{Curriculum, CurriculumItem};
use crate::model::{Variety, Work};

/// Completion of one graduation level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraduationProgress {
    pub graduation: String,
    /// Distinct curriculum items of this graduation with at least one work.
    pub completed: usize,
    /// Curriculum items in this graduation.
    pub total: usize,
}

impl GraduationProgress {
    /// Items still waiting for a first work.
    pub fn remaining(&self) -> usize {
        self.total - self.completed
    }

    /// Completion as a fraction in `0.0..=1.0`; an empty graduation counts as zero.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// The work chosen to depict a curriculum item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Representative<'a> {
    pub item: &'a CurriculumItem,
    pub work: &'a Work,
}

/// Returns the distinct curriculum ids referenced by `works`.
pub fn completed_ids(works: &[Work]) -> BTreeSet<u32> {
    works.iter().map(|work| work.curriculum_id).collect()
}

/// Computes the completion of every graduation, in curriculum graduation order.
///
/// Works whose curriculum id does not resolve are left out of every count.
pub fn graduation_progress(curriculum: &Curriculum, works: &[Work]) -> Vec<GraduationProgress> {
    let mut completed: HashMap<&str, HashSet<u32>> = HashMap::new();
    for work in works {
        match curriculum.get(work.curriculum_id) {
            Some(item) => {
                completed
                    .entry(item.graduation.as_str())
                    .or_default()
                    .insert(item.id);
            }
            None => debug!(
                "work {} references unknown curriculum id {}; excluded from progress",
                work.id, work.curriculum_id
            ),
        }
    }

    curriculum
        .graduations()
        .iter()
        .map(|graduation| GraduationProgress {
            graduation: graduation.clone(),
            completed: completed.get(graduation.as_str()).map_or(0, HashSet::len),
            total: curriculum.items_in(graduation).count(),
        })
        .collect()
}

/// Returns the progress of a single graduation, if the curriculum knows it.
pub fn progress_for(
    curriculum: &Curriculum,
    works: &[Work],
    graduation: &str,
) -> Option<GraduationProgress> {
    graduation_progress(curriculum, works)
        .into_iter()
        .find(|progress| progress.graduation == graduation)
}

/// Orders two candidate works: favorites first, then the most recent.
///
/// Equal candidates compare as [`Ordering::Equal`]; callers keep the earlier one.
fn preference(a: &Work, b: &Work) -> Ordering {
    b.is_favorite
        .cmp(&a.is_favorite)
        .then_with(|| b.created_at.cmp(&a.created_at))
}

/// Picks one representative work per curriculum item, in curriculum declaration order.
///
/// Items without works produce no entry.  Among the works of an item the favorite wins over
/// non-favorites, then the newest wins, and remaining ties go to the work that appears first in
/// `works`, which keeps the result deterministic for a given snapshot.
pub fn select_representatives<'a>(
    curriculum: &'a Curriculum,
    works: &'a [Work],
) -> Vec<Representative<'a>> {
    let mut best: HashMap<u32, &'a Work> = HashMap::new();
    for work in works {
        best.entry(work.curriculum_id)
            .and_modify(|current| {
                if preference(work, *current) == Ordering::Less {
                    *current = work;
                }
            })
            .or_insert(work);
    }

    curriculum
        .items()
        .iter()
        .filter_map(|item| best.get(&item.id).map(|&work| Representative { item, work }))
        .collect()
}

/// Dashboard-level statistics for a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    pub total_works: usize,
    /// Distinct curriculum items with at least one work.
    pub unique_studies: usize,
    pub total_studies: usize,
    pub completion_percentage: f64,
    pub graduations: Vec<GraduationProgress>,
}

/// Computes the overall catalog statistics.
pub fn summarize(curriculum: &Curriculum, works: &[Work]) -> CatalogSummary {
    let unique_studies = completed_ids(works)
        .into_iter()
        .filter(|id| curriculum.get(*id).is_some())
        .count();
    let total_studies = curriculum.len();
    let completion_percentage = if total_studies == 0 {
        0.0
    } else {
        unique_studies as f64 / total_studies as f64 * 100.0
    };

    CatalogSummary {
        total_works: works.len(),
        unique_studies,
        total_studies,
        completion_percentage,
        graduations: graduation_progress(curriculum, works),
    }
}

/// Number of works made in one variety.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VarietyCount {
    pub variety: Variety,
    pub count: usize,
}

/// Counts works per variety in order of first appearance, skipping works without a variety.
pub fn variety_distribution(works: &[Work]) -> Vec<VarietyCount> {
    let mut counts: Vec<VarietyCount> = Vec::new();
    for work in works {
        if work.variety == Variety::NotApplicable {
            continue;
        }
        match counts.iter_mut().find(|entry| entry.variety == work.variety) {
            Some(entry) => entry.count += 1,
            None => counts.push(VarietyCount {
                variety: work.variety,
                count: 1,
            }),
        }
    }
    counts
}

/// Returns up to `limit` works, newest first.
pub fn recent_works(works: &[Work], limit: usize) -> Vec<&Work> {
    let mut sorted: Vec<&Work> = works.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted.truncate(limit);
    sorted
}


#[cfg(test)]
mod proptests {
    use super::tests::{basic_curriculum, work};
    use super::*;
    use proptest::prelude::*;

    fn snapshot() -> impl Strategy<Value = Vec<Work>> {
        prop::collection::vec((1u32..15, 1u32..28, any::<bool>()), 0..40).prop_map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(index, (id, day, favorite))| {
                    work(&format!("w{index}"), id, day).with_favorite(favorite)
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_completed_never_exceeds_total(works in snapshot()) {
            let curriculum = basic_curriculum(10);
            for progress in graduation_progress(&curriculum, &works) {
                prop_assert!(progress.completed <= progress.total);
            }
        }

        #[test]
        fn prop_representatives_are_bounded(works in snapshot()) {
            let curriculum = basic_curriculum(10);
            let representatives = select_representatives(&curriculum, &works);
            prop_assert!(representatives.len() <= completed_ids(&works).len());
            prop_assert!(representatives.len() <= curriculum.len());
        }

        #[test]
        fn prop_selection_is_deterministic(works in snapshot()) {
            let curriculum = basic_curriculum(10);
            let first: Vec<(u32, String)> = select_representatives(&curriculum, &works)
                .iter()
                .map(|r| (r.item.id, r.work.id.clone()))
                .collect();
            let second: Vec<(u32, String)> = select_representatives(&curriculum, &works)
                .iter()
                .map(|r| (r.item.id, r.work.id.clone()))
                .collect();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_no_candidate_beats_the_representative(works in snapshot()) {
            let curriculum = basic_curriculum(10);
            for representative in select_representatives(&curriculum, &works) {
                let item_id = representative.item.id;
                for candidate in works.iter().filter(|w| w.curriculum_id == item_id) {
                    prop_assert_ne!(preference(candidate, representative.work), Ordering::Less);
                }
            }
        }
    }
}

//! Rating and count aggregation over the comments of one geodata set.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::Comment;

/// Group key for comments that are not attached to a layer.
pub const UNASSIGNED: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RatingSummary {
    pub all: f64,
    pub filtered: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CommentCount {
    pub all: usize,
    pub filtered: usize,
}

#[must_use]
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Mean rating of the rated comments, `0` if none is rated.
#[must_use]
pub fn average_rating<'a>(comments: impl IntoIterator<Item = &'a Comment>) -> f64 {
    let (sum, count) = comments
        .into_iter()
        .filter_map(|c| c.rating)
        .fold((0_i64, 0_u32), |(sum, count), r| {
            (sum + i64::from(r), count + 1)
        });

    if count == 0 {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let sum = sum as f64;
        sum / f64::from(count)
    }
}

/// Rounded averages and counts for the full and the filtered comment list.
#[must_use]
pub fn summarize(all: &[Comment], filtered: &[Comment]) -> (RatingSummary, CommentCount) {
    (
        RatingSummary {
            all: round_one_decimal(average_rating(all)),
            filtered: round_one_decimal(average_rating(filtered)),
        },
        CommentCount {
            all: all.len(),
            filtered: filtered.len(),
        },
    )
}

/// Splits comments by layer id, keeping their order within each group.
#[must_use]
pub fn group_by_layer(comments: Vec<Comment>) -> BTreeMap<i32, Vec<Comment>> {
    let mut groups: BTreeMap<i32, Vec<Comment>> = BTreeMap::new();
    for comment in comments {
        let key = comment.layer_id.map_or(UNASSIGNED, |id| id.value());
        groups.entry(key).or_default().push(comment);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CommentId, GeodataId, LayerId, TimeRange};

    fn comment(id: i32, layer: Option<i32>, rating: Option<i32>) -> Comment {
        Comment {
            id: CommentId::new(id),
            geodata_id: GeodataId::new(1),
            layer_id: layer.map(LayerId::new),
            user: None,
            text: "text".to_string(),
            rating,
            geometry: None,
            envelope: None,
            time: TimeRange::default(),
        }
    }

    #[test]
    fn rounds_to_one_decimal() {
        assert!((round_one_decimal(3.666_666) - 3.7).abs() < f64::EPSILON);
        assert!((round_one_decimal(2.25) - 2.3).abs() < f64::EPSILON);
        assert!(round_one_decimal(0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn average_ignores_unrated_and_defaults_to_zero() {
        let comments = vec![
            comment(1, None, Some(4)),
            comment(2, None, None),
            comment(3, None, Some(5)),
        ];
        assert!((average_rating(&comments) - 4.5).abs() < f64::EPSILON);
        assert!(average_rating(&[comment(4, None, None)]).abs() < f64::EPSILON);
        assert!(average_rating(&[]).abs() < f64::EPSILON);
    }

    #[test]
    fn summary_uses_both_lists() {
        let all = vec![
            comment(1, None, Some(1)),
            comment(2, None, Some(2)),
            comment(3, None, Some(2)),
        ];
        let filtered = vec![all[1].clone()];

        let (rating, count) = summarize(&all, &filtered);
        assert!((rating.all - 1.7).abs() < f64::EPSILON);
        assert!((rating.filtered - 2.0).abs() < f64::EPSILON);
        assert_eq!(count, CommentCount { all: 3, filtered: 1 });
    }

    #[test]
    fn groups_preserve_every_comment() {
        let comments = vec![
            comment(1, Some(7), None),
            comment(2, None, None),
            comment(3, Some(7), None),
            comment(4, Some(9), None),
        ];

        let groups = group_by_layer(comments);
        assert_eq!(groups.values().map(Vec::len).sum::<usize>(), 4);
        assert_eq!(groups[&UNASSIGNED].len(), 1);
        let ids: Vec<i32> = groups[&7].iter().map(|c| c.id.value()).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}

//! Overlap layout for a day column.
//!
//! Meetings starting on a day are swept in `(from, to)` order. A run of
//! meetings with no gap between them forms a group; inside a group each
//! meeting takes the first column whose last meeting it does not overlap.
//! First-fit over sorted intervals is optimal, so a group gets exactly as
//! many columns as it has simultaneously active meetings.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::models::meeting::Meeting;
use crate::models::timeslot::MeetingId;
use crate::services::geometry::CoordinateMapper;

/// Vertical lane of mutually non-overlapping meetings
pub type Column<'a> = Vec<&'a Meeting>;
/// Maximal run of meetings not separated by a gap
pub type Group<'a> = Vec<Column<'a>>;

/// Pixel box of one meeting, relative to the grid origin
#[derive(Debug, Clone, PartialEq)]
pub struct MeetingBox {
    pub id: MeetingId,
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
}

impl MeetingBox {
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x < self.right() && y >= self.top && y < self.bottom()
    }
}

/// Groups for the meetings that start on `date` (in the mapper's zone)
pub fn layout_day<'a>(meetings: &'a [Meeting], date: NaiveDate, mapper: &CoordinateMapper) -> Vec<Group<'a>> {
    let tz = mapper.tz();
    let day: Vec<&Meeting> = meetings.iter().filter(|m| m.starts_on(date, tz)).collect();
    group_columns(day)
}

/// Groups for the visible day at `day_index`
pub fn layout_day_index<'a>(
    meetings: &'a [Meeting],
    day_index: u32,
    mapper: &CoordinateMapper,
) -> Vec<Group<'a>> {
    let date = mapper.reference_date() + Duration::days(day_index as i64);
    layout_day(meetings, date, mapper)
}

/// Partition meetings into overlap-free columns, group by group
pub fn group_columns(mut meetings: Vec<&Meeting>) -> Vec<Group<'_>> {
    meetings.sort_by(|a, b| (a.time.from, a.time.to).cmp(&(b.time.from, b.time.to)));

    let mut groups: Vec<Group<'_>> = Vec::new();
    let mut columns: Group<'_> = Vec::new();
    let mut last_event_ending: Option<DateTime<Utc>> = None;

    for meeting in meetings {
        if let Some(ending) = last_event_ending {
            if meeting.time.from >= ending {
                groups.push(std::mem::take(&mut columns));
                last_event_ending = None;
            }
        }

        let free_column = columns.iter_mut().find(|column| {
            column
                .last()
                .map_or(true, |last| !last.overlaps(meeting))
        });

        match free_column {
            Some(column) => column.push(meeting),
            None => columns.push(vec![meeting]),
        }

        last_event_ending = Some(match last_event_ending {
            Some(ending) => ending.max(meeting.time.to),
            None => meeting.time.to,
        });
    }

    if !columns.is_empty() {
        groups.push(columns);
    }

    groups
}

/// Number of columns `meeting` may span, starting at its own column and
/// extending right until a column holds something it overlaps.
pub fn expand(meeting: &Meeting, column_index: usize, columns: &[Column<'_>]) -> usize {
    let mut span = 1;
    for column in columns.iter().skip(column_index + 1) {
        if column.iter().any(|other| other.overlaps(meeting)) {
            break;
        }
        span += 1;
    }
    span
}

/// Pixel boxes for every meeting starting on `date`
pub fn day_boxes(
    meetings: &[Meeting],
    date: NaiveDate,
    mapper: &CoordinateMapper,
    track_width: f32,
) -> Vec<MeetingBox> {
    let day_offset = (date - mapper.reference_date()).num_days() as f32 * track_width;
    let mut boxes = Vec::new();

    for group in layout_day(meetings, date, mapper) {
        let column_count = group.len() as f32;
        for (column_index, column) in group.iter().enumerate() {
            for meeting in column {
                let span = expand(meeting, column_index, &group) as f32;
                boxes.push(MeetingBox {
                    id: meeting.id.clone(),
                    top: mapper.position(meeting.time.from, track_width).y,
                    left: day_offset + column_index as f32 / column_count * track_width,
                    width: span / column_count * track_width,
                    height: mapper.height(&meeting.time),
                });
            }
        }
    }

    boxes
}

/// Pixel boxes across all visible days
pub fn week_boxes(meetings: &[Meeting], mapper: &CoordinateMapper, track_width: f32) -> Vec<MeetingBox> {
    mapper
        .visible_dates()
        .into_iter()
        .flat_map(|date| day_boxes(meetings, date, mapper, track_width))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    fn meeting(id: &str, day: u32, from: (u32, u32), to: (u32, u32)) -> Meeting {
        Meeting::builder()
            .id(MeetingId::persisted(id))
            .start(Utc.with_ymd_and_hms(2025, 1, day, from.0, from.1, 0).unwrap())
            .end(Utc.with_ymd_and_hms(2025, 1, day, to.0, to.1, 0).unwrap())
            .build()
            .unwrap()
    }

    fn ids(group: &Group<'_>) -> Vec<Vec<String>> {
        group
            .iter()
            .map(|column| column.iter().map(|m| m.id.to_string()).collect())
            .collect()
    }

    fn mapper() -> CoordinateMapper {
        CoordinateMapper::new(chrono_tz::UTC, monday())
    }

    #[test]
    fn test_overlapping_pair_gets_two_columns() {
        let meetings = vec![
            meeting("a", 6, (9, 0), (10, 0)),
            meeting("b", 6, (9, 30), (10, 30)),
        ];
        let groups = layout_day(&meetings, monday(), &mapper());

        assert_eq!(groups.len(), 1);
        assert_eq!(ids(&groups[0]), vec![vec!["a"], vec!["b"]]);
    }

    #[test]
    fn test_gap_starts_new_group() {
        let meetings = vec![
            meeting("a", 6, (9, 0), (10, 0)),
            meeting("b", 6, (9, 30), (10, 30)),
            meeting("c", 6, (11, 0), (11, 30)),
        ];
        let groups = layout_day(&meetings, monday(), &mapper());

        assert_eq!(groups.len(), 2);
        assert_eq!(ids(&groups[1]), vec![vec!["c"]]);
    }

    #[test]
    fn test_touching_meetings_share_a_group_boundary() {
        let meetings = vec![
            meeting("a", 6, (9, 0), (10, 0)),
            meeting("b", 6, (10, 0), (11, 0)),
        ];
        let groups = layout_day(&meetings, monday(), &mapper());
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_first_fit_reuses_freed_column() {
        // a and b overlap; c starts after a ends but while b runs, so it
        // takes a's column back.
        let meetings = vec![
            meeting("c", 6, (10, 0), (11, 0)),
            meeting("a", 6, (9, 0), (10, 0)),
            meeting("b", 6, (9, 30), (12, 0)),
        ];
        let groups = layout_day(&meetings, monday(), &mapper());

        assert_eq!(groups.len(), 1);
        assert_eq!(ids(&groups[0]), vec![vec!["a", "c"], vec!["b"]]);
    }

    #[test]
    fn test_other_days_are_filtered() {
        let meetings = vec![
            meeting("mon", 6, (9, 0), (10, 0)),
            meeting("tue", 7, (9, 0), (10, 0)),
        ];
        let groups = layout_day_index(&meetings, 1, &mapper());
        assert_eq!(groups.len(), 1);
        assert_eq!(ids(&groups[0]), vec![vec!["tue"]]);
    }

    #[test]
    fn test_expand_into_empty_neighbours() {
        // Columns b+d | a | c: d can widen over a's column but not c's.
        let meetings = vec![
            meeting("a", 6, (9, 0), (10, 0)),
            meeting("b", 6, (9, 0), (9, 30)),
            meeting("c", 6, (9, 0), (11, 0)),
            meeting("d", 6, (10, 0), (10, 30)),
        ];
        let groups = layout_day(&meetings, monday(), &mapper());
        let group = &groups[0];
        assert_eq!(ids(group), vec![vec!["b", "d"], vec!["a"], vec!["c"]]);

        let d = group[0][1];
        assert_eq!(expand(d, 0, group), 2);
        let c = group[2][0];
        assert_eq!(expand(c, 2, group), 1);
        let b = group[0][0];
        assert_eq!(expand(b, 0, group), 1);
    }

    #[test]
    fn test_boxes_for_overlapping_pair() {
        let meetings = vec![
            meeting("a", 6, (9, 0), (10, 0)),
            meeting("b", 6, (9, 30), (10, 30)),
            meeting("c", 6, (11, 0), (11, 30)),
        ];
        let boxes = day_boxes(&meetings, monday(), &mapper(), 100.0);

        assert_eq!(
            boxes,
            vec![
                MeetingBox { id: MeetingId::persisted("a"), top: 432.0, left: 0.0, width: 50.0, height: 48.0 },
                MeetingBox { id: MeetingId::persisted("b"), top: 456.0, left: 50.0, width: 50.0, height: 48.0 },
                MeetingBox { id: MeetingId::persisted("c"), top: 528.0, left: 0.0, width: 100.0, height: 24.0 },
            ]
        );
    }

    #[test]
    fn test_week_boxes_offset_by_day() {
        let meetings = vec![meeting("wed", 8, (9, 0), (10, 0))];
        let boxes = week_boxes(&meetings, &mapper(), 100.0);
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].left, 200.0);
        assert!(boxes[0].contains(250.0, 450.0));
        assert!(!boxes[0].contains(150.0, 450.0));
    }

    #[test]
    fn test_empty_day_has_no_groups() {
        assert!(layout_day(&[], monday(), &mapper()).is_empty());
    }
}

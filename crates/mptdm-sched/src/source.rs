//! Choice of the next segment to schedule.

use crate::connection::{Connection, SegmentSource};
use crate::segment::Segment;

/// Next segment waiting to be sent, and the queue it sits in.
///
/// Reinjections go first, except in fallback mode where only the send queue
/// is used so data leaves in its original order.
pub fn next_candidate(conn: &Connection) -> Option<(&Segment, SegmentSource)> {
    if conn.in_fallback() {
        return conn
            .send_queue
            .front()
            .map(|segment| (segment, SegmentSource::Send));
    }

    if let Some(segment) = conn.reinject_queue.front() {
        return Some((segment, SegmentSource::Reinject));
    }

    conn.send_queue
        .front()
        .map(|segment| (segment, SegmentSource::Send))
}

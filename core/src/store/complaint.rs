use super::PulseStore;
use crate::{
    complaint_generator::ComplaintRecord,
    error::PulseResult,
};
use rusqlite::{params, Connection};

// Helper function for mapping complaint rows
fn complaint_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<ComplaintRecord> {
    Ok(ComplaintRecord {
        complaint_id: row.get(0)?,
        operator: row.get(1)?,
        complaint_text: row.get(2)?,
        complaint_category: row.get(3)?,
        sentiment_score: row.get(4)?,
        date: row.get(5)?,
        governorate: row.get(6)?,
        likes: row.get(7)?,
        replies: row.get(8)?,
        source: row.get(9)?,
        collection_timestamp: row.get(10)?,
    })
}

/// Delete every stored complaint and insert `complaints`. Returns rows written.
pub(super) fn replace_complaints(
    conn: &Connection,
    complaints: &[ComplaintRecord],
) -> PulseResult<usize> {
    conn.execute("DELETE FROM customer_complaints", [])?;
    let mut stmt = conn.prepare(
        "INSERT INTO customer_complaints (
            complaint_id, operator, complaint_text, complaint_category, sentiment_score,
            date, governorate, likes, replies, source, collection_timestamp
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;
    for c in complaints {
        stmt.execute(params![
            c.complaint_id,
            &c.operator,
            &c.complaint_text,
            &c.complaint_category,
            c.sentiment_score,
            c.date,
            &c.governorate,
            c.likes,
            c.replies,
            &c.source,
            c.collection_timestamp,
        ])?;
    }
    Ok(complaints.len())
}

impl PulseStore {
    // ── Complaint ──────────────────────────────────────────────────

    pub fn all_complaints(&self) -> PulseResult<Vec<ComplaintRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT complaint_id, operator, complaint_text, complaint_category, sentiment_score,
                    date, governorate, likes, replies, source, collection_timestamp
             FROM customer_complaints
             ORDER BY complaint_id ASC",
        )?;
        let rows = stmt.query_map([], complaint_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn get_complaint(&self, complaint_id: i64) -> PulseResult<Option<ComplaintRecord>> {
        use rusqlite::OptionalExtension;
        self.conn
            .query_row(
                "SELECT complaint_id, operator, complaint_text, complaint_category, sentiment_score,
                        date, governorate, likes, replies, source, collection_timestamp
                 FROM customer_complaints WHERE complaint_id = ?1",
                params![complaint_id],
                complaint_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }
}

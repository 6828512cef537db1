use chrono::NaiveDateTime;

use super::{Store, StoreError};
use crate::types::{LogEntry, LogKind};

const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

impl Store {
    /// Append a log row stamped with the local wall clock.
    pub fn append(&self, kind: LogKind, payload: &serde_json::Value) -> Result<i64, StoreError> {
        self.append_at(chrono::Local::now().naive_local(), kind, payload)
    }

    /// Append a log row with an explicit timestamp. Rows are never updated.
    pub fn append_at(
        &self,
        ts: NaiveDateTime,
        kind: LogKind,
        payload: &serde_json::Value,
    ) -> Result<i64, StoreError> {
        let payload = serde_json::to_string(payload)?;
        let ts = ts.format(TS_FORMAT).to_string();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO logs (ts, kind, payload) VALUES (?1, ?2, ?3)",
                rusqlite::params![ts, kind.as_str(), payload],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Most recent log rows, newest first.
    pub fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>, StoreError> {
        let raw: Vec<(i64, String, String, String)> = self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, ts, kind, payload FROM logs ORDER BY id DESC LIMIT ?1")?;
            let rows = stmt
                .query_map([limit as i64], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        raw.into_iter()
            .map(|(id, ts, kind, payload)| {
                Ok(LogEntry {
                    id,
                    ts,
                    kind: kind.parse().map_err(StoreError::Serialization)?,
                    payload: serde_json::from_str(&payload)?,
                })
            })
            .collect()
    }

    /// Completed-action counts for one hour of the day, most frequent first.
    pub fn action_counts_at_hour(
        &self,
        hour: u32,
        limit: usize,
    ) -> Result<Vec<(String, i64)>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT json_extract(payload, '$.name') AS name, COUNT(*) AS c
                 FROM logs
                 WHERE kind = 'action'
                   AND json_extract(payload, '$.status') = 'completed'
                   AND CAST(substr(ts, 12, 2) AS INTEGER) = ?1
                 GROUP BY name
                 ORDER BY c DESC, name ASC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![hour, limit as i64], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 4, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn append_ids_increase() {
        let store = Store::in_memory().unwrap();
        let a = store
            .append(LogKind::Utterance, &json!({"text": "hi"}))
            .unwrap();
        let b = store
            .append(LogKind::Utterance, &json!({"text": "again"}))
            .unwrap();
        assert!(b > a);
    }

    #[test]
    fn recent_logs_newest_first_with_payloads() {
        let store = Store::in_memory().unwrap();
        store
            .append_at(at(9, 0), LogKind::Utterance, &json!({"text": "open mail"}))
            .unwrap();
        store
            .append_at(
                at(9, 1),
                LogKind::Action,
                &json!({"name": "open_app", "args": {"name": "mail"}, "status": "completed", "result": "Opened mail"}),
            )
            .unwrap();

        let logs = store.recent_logs(10).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].kind, LogKind::Action);
        assert_eq!(logs[0].payload["name"], "open_app");
        assert_eq!(logs[0].ts, "2026-04-01T09:01:00");
        assert_eq!(logs[1].payload["text"], "open mail");

        assert_eq!(store.recent_logs(1).unwrap().len(), 1);
    }

    #[test]
    fn action_counts_only_completed_in_hour() {
        let store = Store::in_memory().unwrap();
        let done = |name: &str| json!({"name": name, "args": {}, "status": "completed", "result": "ok"});
        store.append_at(at(8, 5), LogKind::Action, &done("weather")).unwrap();
        store.append_at(at(8, 40), LogKind::Action, &done("weather")).unwrap();
        store.append_at(at(8, 50), LogKind::Action, &done("open_app")).unwrap();
        store.append_at(at(9, 0), LogKind::Action, &done("search")).unwrap();
        store
            .append_at(
                at(8, 55),
                LogKind::Action,
                &json!({"name": "file_move", "args": {}, "status": "failed", "error": "x"}),
            )
            .unwrap();

        let counts = store.action_counts_at_hour(8, 5).unwrap();
        assert_eq!(
            counts,
            vec![("weather".to_string(), 2), ("open_app".to_string(), 1)]
        );
    }
}

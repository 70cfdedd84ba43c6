//! Append-only metric history.

use rusqlite::params;

use super::Index;
use super::helpers::{SNAPSHOTS_COLUMNS, row_to_snapshot};
use crate::error::Result;
use crate::types::Snapshot;

impl Index {
    /// Append a snapshot, returning it with its assigned id.
    ///
    /// The `id` field of the argument is ignored.
    pub fn insert_snapshot(&mut self, snapshot: &Snapshot) -> Result<Snapshot> {
        let conn = self.connection()?;
        conn.execute(
            &format!(
                "INSERT INTO snapshots ({SNAPSHOTS_COLUMNS}) VALUES \
                 (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
            ),
            params![
                snapshot.timestamp,
                snapshot.tag,
                snapshot.source,
                snapshot.git_branch,
                snapshot.git_commit,
                snapshot.files,
                snapshot.symbols,
                snapshot.edges,
                snapshot.cycles,
                snapshot.god_components,
                snapshot.bottlenecks,
                snapshot.dead_exports,
                snapshot.layer_violations,
                snapshot.health_score,
                snapshot.tangle_ratio,
                snapshot.avg_complexity,
                snapshot.brain_methods
            ],
        )?;
        Ok(Snapshot {
            id: conn.last_insert_rowid(),
            ..snapshot.clone()
        })
    }

    /// Snapshots newest first, optionally limited and bounded below by timestamp.
    pub fn get_snapshots(&self, limit: Option<usize>, since: Option<i64>) -> Result<Vec<Snapshot>> {
        let conn = self.connection()?;
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let mut stmt = conn.prepare(&format!(
            "SELECT {SNAPSHOTS_COLUMNS} FROM snapshots
             WHERE (?1 IS NULL OR timestamp >= ?1)
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2"
        ))?;
        let snapshots = stmt
            .query_map(params![since, limit], row_to_snapshot)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_at(timestamp: i64, health: u32) -> Snapshot {
        Snapshot {
            id: 0,
            timestamp,
            tag: None,
            source: "snapshot".to_string(),
            git_branch: None,
            git_commit: None,
            files: 1,
            symbols: 2,
            edges: 1,
            cycles: 0,
            god_components: 0,
            bottlenecks: 0,
            dead_exports: 0,
            layer_violations: 0,
            health_score: health,
            tangle_ratio: 0.0,
            avg_complexity: 0.0,
            brain_methods: 0,
        }
    }

    #[test]
    fn get_snapshots_is_newest_first_with_limit_and_since() {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let mut index = Index::open(&dir.path().join("test.db")).unwrap();
        for (ts, health) in [(100, 90), (300, 70), (200, 80)] {
            index.insert_snapshot(&snapshot_at(ts, health)).unwrap();
        }

        let all = index.get_snapshots(None, None).unwrap();
        let limited = index.get_snapshots(Some(2), None).unwrap();
        let since = index.get_snapshots(None, Some(200)).unwrap();

        let stamps = |v: &[Snapshot]| v.iter().map(|s| s.timestamp).collect::<Vec<_>>();
        assert_eq!(stamps(&all), vec![300, 200, 100]);
        assert_eq!(stamps(&limited), vec![300, 200]);
        assert_eq!(stamps(&since), vec![300, 200]);
    }

    #[test]
    fn insert_assigns_fresh_ids() {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let mut index = Index::open(&dir.path().join("test.db")).unwrap();

        let a = index.insert_snapshot(&snapshot_at(1, 50)).unwrap();
        let b = index.insert_snapshot(&snapshot_at(2, 50)).unwrap();

        assert!(b.id > a.id);
    }
}

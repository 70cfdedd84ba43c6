//! Graph metrics, cluster assignments and upstream signals.
//!
//! Graph metrics and clusters are batch outputs: each write replaces the
//! whole table. File stats and symbol complexity are inputs recorded by
//! history mining and complexity analysis outside this crate.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::params;

use super::Index;
use super::helpers::normalize_path;
use crate::error::{Error, Result};
use crate::types::{
    ClusterAssignment, FileId, FileStats, SymbolComplexity, SymbolId, SymbolMetrics,
};

impl Index {
    /// Replace all stored graph metrics.
    pub fn replace_graph_metrics(&mut self, metrics: &[SymbolMetrics]) -> Result<()> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM graph_metrics", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO graph_metrics (symbol_id, pagerank, in_degree, out_degree, betweenness)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for m in metrics {
                stmt.execute(params![
                    m.symbol_id.as_i64(),
                    m.pagerank,
                    m.in_degree,
                    m.out_degree,
                    m.betweenness
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Stored graph metrics keyed by symbol.
    pub fn get_graph_metrics(&self) -> Result<HashMap<SymbolId, SymbolMetrics>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT symbol_id, pagerank, in_degree, out_degree, betweenness FROM graph_metrics",
        )?;
        let rows = stmt.query_map([], |row| {
            let symbol_id = SymbolId::from(row.get::<_, i64>(0)?);
            Ok((
                symbol_id,
                SymbolMetrics {
                    symbol_id,
                    pagerank: row.get(1)?,
                    in_degree: row.get(2)?,
                    out_degree: row.get(3)?,
                    betweenness: row.get(4)?,
                },
            ))
        })?;
        Ok(rows.collect::<std::result::Result<HashMap<_, _>, _>>()?)
    }

    /// Replace all stored cluster assignments.
    pub fn replace_clusters(&mut self, assignments: &[ClusterAssignment]) -> Result<()> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM clusters", [])?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO clusters (symbol_id, cluster_id, label) VALUES (?1, ?2, ?3)")?;
            for a in assignments {
                stmt.execute(params![a.symbol_id.as_i64(), a.cluster_id, a.label])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Stored cluster assignments, ordered by cluster then symbol.
    pub fn get_clusters(&self) -> Result<Vec<ClusterAssignment>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare("SELECT symbol_id, cluster_id, label FROM clusters ORDER BY cluster_id, symbol_id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ClusterAssignment {
                    symbol_id: SymbolId::from(row.get::<_, i64>(0)?),
                    cluster_id: row.get(1)?,
                    label: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Record churn and co-change numbers for an indexed file.
    ///
    /// Returns [`Error::NotFound`] if the path is not indexed.
    pub fn record_file_stats(&mut self, path: &Path, stats: &FileStats) -> Result<()> {
        let file_id = self
            .get_file_id(path)?
            .ok_or_else(|| Error::NotFound(format!("file not indexed: {}", normalize_path(path))))?;
        let conn = self.connection()?;
        conn.execute(
            "INSERT OR REPLACE INTO file_stats (file_id, commit_count, total_churn, cochange_entropy, health_score)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                file_id.as_i64(),
                stats.commit_count,
                stats.total_churn,
                stats.cochange_entropy,
                stats.health_score
            ],
        )?;
        Ok(())
    }

    /// All recorded file stats keyed by file.
    pub fn get_all_file_stats(&self) -> Result<HashMap<FileId, FileStats>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT file_id, commit_count, total_churn, cochange_entropy, health_score FROM file_stats",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                FileId::from(row.get::<_, i64>(0)?),
                FileStats {
                    commit_count: row.get(1)?,
                    total_churn: row.get(2)?,
                    cochange_entropy: row.get(3)?,
                    health_score: row.get(4)?,
                },
            ))
        })?;
        Ok(rows.collect::<std::result::Result<HashMap<_, _>, _>>()?)
    }

    /// Record complexity numbers for a symbol of the current generation.
    pub fn record_symbol_complexity(
        &mut self,
        symbol_id: SymbolId,
        complexity: &SymbolComplexity,
    ) -> Result<()> {
        let conn = self.connection()?;
        let changed = conn.execute(
            "INSERT OR REPLACE INTO symbol_metrics (symbol_id, cognitive_complexity, line_count)
             SELECT id, ?2, ?3 FROM symbols WHERE id = ?1",
            params![
                symbol_id.as_i64(),
                complexity.cognitive_complexity,
                complexity.line_count
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("symbol {symbol_id}")));
        }
        Ok(())
    }

    /// All recorded symbol complexity keyed by symbol.
    pub fn get_all_symbol_complexity(&self) -> Result<HashMap<SymbolId, SymbolComplexity>> {
        let conn = self.connection()?;
        let mut stmt =
            conn.prepare("SELECT symbol_id, cognitive_complexity, line_count FROM symbol_metrics")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                SymbolId::from(row.get::<_, i64>(0)?),
                SymbolComplexity {
                    cognitive_complexity: row.get(1)?,
                    line_count: row.get(2)?,
                },
            ))
        })?;
        Ok(rows.collect::<std::result::Result<HashMap<_, _>, _>>()?)
    }
}

use anyhow::Result;

use aisource_core::site::{clean_domain, generate_site_id, CreateSiteParams, Site};

use crate::DuckDbBackend;

const SITE_COLUMNS: &str = "id, domain, name, owner_id, \
     CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

fn site_from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Site> {
    Ok(Site {
        id: row.get(0)?,
        domain: row.get(1)?,
        name: row.get(2)?,
        owner_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

impl DuckDbBackend {
    /// Create a site for `owner_id`. The domain is stored cleaned (scheme
    /// prefix and trailing slash stripped); the id is generated here, not
    /// caller-supplied.
    pub async fn create_site(&self, params: CreateSiteParams) -> Result<Site> {
        let conn = self.conn.lock().await;
        let id = generate_site_id();
        let domain = clean_domain(&params.domain);

        conn.execute(
            "INSERT INTO sites (id, domain, name, owner_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
            duckdb::params![id, domain, params.name, params.owner_id],
        )?;

        // Read back the created row to get timestamps.
        let mut stmt = conn.prepare(&format!("SELECT {SITE_COLUMNS} FROM sites WHERE id = ?1"))?;
        let site = stmt.query_row(duckdb::params![id], site_from_row)?;
        Ok(site)
    }

    /// All sites owned by `owner_id`, newest first.
    pub async fn list_sites(&self, owner_id: &str) -> Result<Vec<Site>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SITE_COLUMNS} FROM sites WHERE owner_id = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(duckdb::params![owner_id], site_from_row)?;

        let mut sites = Vec::new();
        for row in rows {
            sites.push(row?);
        }
        Ok(sites)
    }

    pub async fn get_site(&self, id: &str) -> Result<Option<Site>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!("SELECT {SITE_COLUMNS} FROM sites WHERE id = ?1"))?;
        let site = stmt.query_row(duckdb::params![id], site_from_row).ok();
        Ok(site)
    }
}

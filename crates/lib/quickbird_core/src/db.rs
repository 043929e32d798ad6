//! Throwaway PostgreSQL instances for integration tests.
//!
//! Spawns `initdb`/`pg_ctl` from the installation found via
//! `pg_config` on PATH, with data in a tempdir that is removed when
//! the handle drops.

use std::net::TcpListener;
use std::path::PathBuf;
use std::time::Duration;

use sqlx::postgres::PgPool;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::sleep;
use tracing::debug;

/// Database created inside each ephemeral instance.
const DATABASE_NAME: &str = "quickbird";

/// Maximum time to wait for PostgreSQL to become ready.
const PG_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval when waiting for PostgreSQL readiness.
const PG_READY_POLL: Duration = Duration::from_millis(200);

/// Errors from ephemeral database management.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("PostgreSQL command failed: {0}")]
    Command(String),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pg_config not found on PATH")]
    PgConfigNotFound,

    #[error("PostgreSQL not ready after {0:?}")]
    ReadyTimeout(Duration),
}

/// A temporary PostgreSQL instance, torn down on drop.
pub struct EphemeralDb {
    bin_dir: PathBuf,
    data_dir: PathBuf,
    port: u16,
    started: bool,
    _tempdir: tempfile::TempDir,
}

impl EphemeralDb {
    /// Locate PG binaries via `pg_config --bindir` and prepare a
    /// tempdir-backed instance. Does not start the server.
    pub async fn new() -> Result<Self, DbError> {
        let output = Command::new("pg_config")
            .arg("--bindir")
            .output()
            .await
            .map_err(|_| DbError::PgConfigNotFound)?;
        if !output.status.success() {
            return Err(DbError::PgConfigNotFound);
        }
        let bin_dir = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());

        let tempdir = tempfile::tempdir()?;
        let data_dir = tempdir.path().join("pgdata");

        Ok(Self {
            bin_dir,
            data_dir,
            port: 0,
            started: false,
            _tempdir: tempdir,
        })
    }

    /// Initialise the data directory, start the server on a free port,
    /// and create the application database.
    pub async fn start(&mut self) -> Result<(), DbError> {
        let initdb = self.bin_dir.join("initdb");
        let output = Command::new(&initdb)
            .arg("-D")
            .arg(&self.data_dir)
            .arg("--no-locale")
            .arg("--encoding=UTF8")
            .output()
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DbError::Command(format!("initdb failed: {stderr}")));
        }

        self.port = find_free_port()?;
        debug!(port = self.port, "starting ephemeral PostgreSQL");

        let pg_ctl = self.bin_dir.join("pg_ctl");
        let port_opt = format!(
            "-p {} -k {} -h localhost",
            self.port,
            self.data_dir.display()
        );
        let logfile = self.data_dir.join("postgresql.log");
        let output = Command::new(&pg_ctl)
            .arg("-D")
            .arg(&self.data_dir)
            .arg("-o")
            .arg(&port_opt)
            .arg("-l")
            .arg(&logfile)
            .arg("start")
            .output()
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DbError::Command(format!("pg_ctl start failed: {stderr}")));
        }

        self.wait_for_ready().await?;
        self.started = true;
        self.create_database().await?;
        Ok(())
    }

    /// Stop the server. Also invoked best-effort on drop.
    pub async fn stop(&mut self) -> Result<(), DbError> {
        if !self.started {
            return Ok(());
        }
        let pg_ctl = self.bin_dir.join("pg_ctl");
        let output = Command::new(&pg_ctl)
            .arg("-D")
            .arg(&self.data_dir)
            .arg("-m")
            .arg("fast")
            .arg("stop")
            .output()
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DbError::Command(format!("pg_ctl stop failed: {stderr}")));
        }
        self.started = false;
        Ok(())
    }

    /// Connection URL for the application database.
    pub fn connection_url(&self) -> String {
        format!("postgresql://localhost:{}/{DATABASE_NAME}", self.port)
    }

    async fn wait_for_ready(&self) -> Result<(), DbError> {
        let pg_isready = self.bin_dir.join("pg_isready");
        let deadline = tokio::time::Instant::now() + PG_READY_TIMEOUT;
        loop {
            let output = Command::new(&pg_isready)
                .arg("-p")
                .arg(self.port.to_string())
                .arg("-h")
                .arg("localhost")
                .output()
                .await?;
            if output.status.success() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DbError::ReadyTimeout(PG_READY_TIMEOUT));
            }
            sleep(PG_READY_POLL).await;
        }
    }

    async fn create_database(&self) -> Result<(), DbError> {
        let maintenance_url = format!("postgresql://localhost:{}/postgres", self.port);
        let pool = PgPool::connect(&maintenance_url).await?;
        // CREATE DATABASE cannot use bind parameters.
        sqlx::query(&format!("CREATE DATABASE \"{DATABASE_NAME}\""))
            .execute(&pool)
            .await?;
        pool.close().await;
        Ok(())
    }
}

impl Drop for EphemeralDb {
    fn drop(&mut self) {
        if self.started {
            let pg_ctl = self.bin_dir.join("pg_ctl");
            let _ = std::process::Command::new(pg_ctl)
                .arg("-D")
                .arg(&self.data_dir)
                .arg("-m")
                .arg("immediate")
                .arg("stop")
                .output();
        }
    }
}

/// Find a free ephemeral port by binding to port 0.
fn find_free_port() -> Result<u16, DbError> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

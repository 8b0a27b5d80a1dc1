//! Database lifecycle: create, delete, list and stat.

use http::StatusCode;

use crate::client::Client;
use crate::error::{CouchResult, Operation};
use crate::path;
use crate::transport::Request;
use crate::types::system::DatabaseInfo;

impl Client {
    /// `PUT /{db}`. Returns false if the database could not be created.
    pub async fn create_database(&self, name: &str) -> CouchResult<bool> {
        let response = self.send(Request::put(path::database(name))).await?;
        if response.status_in(&[200, 201]) {
            return Ok(true);
        }

        self.failed(Operation::CreateDatabase, &response, false)
    }

    /// `DELETE /{db}`.
    pub async fn delete_database(&self, name: &str) -> CouchResult<bool> {
        let response = self.send(Request::delete(path::database(name))).await?;
        if response.status == StatusCode::OK {
            return Ok(true);
        }

        self.failed(Operation::DeleteDatabase, &response, false)
    }

    /// Names of every database on the server.
    pub async fn list_databases(&self) -> CouchResult<Option<Vec<String>>> {
        let response = self.send(Request::get("/_all_dbs")).await?;
        if response.status == StatusCode::OK {
            return Self::decode(Operation::ListDatabases, &response).map(Some);
        }

        self.failed(Operation::ListDatabases, &response, None)
    }

    pub async fn database_info(&self, name: &str) -> CouchResult<Option<DatabaseInfo>> {
        let response = self.send(Request::get(path::database(name))).await?;
        if response.status == StatusCode::OK {
            return Self::decode(Operation::DatabaseInfo, &response).map(Some);
        }

        self.failed(Operation::DatabaseInfo, &response, None)
    }

    /// A missing database is `false` in either error mode.
    pub async fn database_exists(&self, name: &str) -> CouchResult<bool> {
        let response = self.send(Request::get(path::database(name))).await?;
        match response.status {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => self.failed(Operation::DatabaseInfo, &response, false),
        }
    }
}

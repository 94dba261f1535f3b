#![allow(dead_code)]

use async_trait::async_trait;
use rusqlite::Connection;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use text2sql::prompts::Conversation;
use text2sql::{
    GenerationCapability, Pipeline, QueryStore, SqliteStore, TabularResult, Text2SqlError,
};

/// Replies with queued completions in order; an empty queue is a failure.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, String>>>,
    pub seen: Mutex<Vec<Conversation>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationCapability for ScriptedGenerator {
    async fn submit(&self, conversation: &Conversation) -> text2sql::Result<String> {
        self.seen.lock().unwrap().push(conversation.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(msg)) => Err(Text2SqlError::Generation(msg)),
            None => Err(Text2SqlError::Generation("no scripted reply left".to_string())),
        }
    }
}

/// SQLite store that remembers every statement it was asked to run.
pub struct RecordingStore {
    inner: SqliteStore,
    pub executed: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryStore for RecordingStore {
    async fn execute(&self, sql: &str) -> text2sql::Result<TabularResult> {
        self.executed.lock().unwrap().push(sql.to_string());
        self.inner.execute(sql).await
    }

    async fn ping(&self) -> bool {
        self.inner.ping().await
    }

    fn location(&self) -> String {
        self.inner.location()
    }
}

/// Store whose database cannot be reached.
pub struct OfflineStore;

#[async_trait]
impl QueryStore for OfflineStore {
    async fn execute(&self, _sql: &str) -> text2sql::Result<TabularResult> {
        Err(Text2SqlError::Store("unable to open database file".to_string()))
    }

    async fn ping(&self) -> bool {
        false
    }

    fn location(&self) -> String {
        "/var/lib/text2sql/offline.db".to_string()
    }
}

pub fn sales_store() -> Arc<RecordingStore> {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE SALES_LOGISTICS (
             SalesOrder TEXT, SalesType TEXT, OverallStatus TEXT, Plant TEXT,
             OrderQty REAL, DeliveryQty REAL, NameSoldtoParty TEXT
         );
         INSERT INTO SALES_LOGISTICS VALUES ('1001', 'ZODM', 'A', '1000', 100, 100, 'Siam Foods');
         INSERT INTO SALES_LOGISTICS VALUES ('1002', 'ZOEX', 'B', '1100', 250, 50, 'Pacific Cans');
         INSERT INTO SALES_LOGISTICS VALUES ('1003', 'ZODM', 'B', '2000', 75, 0, 'Siam Foods');",
    )
    .unwrap();
    Arc::new(RecordingStore {
        inner: SqliteStore::from_connection(conn, "sales-test.db"),
        executed: Mutex::new(Vec::new()),
    })
}

pub fn pipeline(llm: Arc<ScriptedGenerator>, store: Arc<RecordingStore>) -> Pipeline {
    Pipeline::new(llm, store)
}

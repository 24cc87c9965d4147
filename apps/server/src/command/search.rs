// apps/server/src/command/search.rs
//! 客户端命令 - 连接正在运行的服务

use super::Command;
use crate::config::Config;
use crate::error::{Result, WrapErr};

use rpc::{NoteSearchClient, search::SearchRequest};
use tarpc::{client, context, tokio_serde::formats::Bincode};

async fn connect(config: &Config) -> Result<NoteSearchClient> {
    let socket_path = config.socket_path();
    let transport = tarpc::serde_transport::unix::connect(&socket_path, Bincode::default)
        .await
        .wrap_err_with(|| format!("cannot reach the server at {:?}; is `notes-server serve` running?", socket_path))?;
    Ok(NoteSearchClient::new(client::Config::default(), transport).spawn())
}

pub struct SearchCommand {
    config: Config,
    request: SearchRequest,
}

impl SearchCommand {
    pub fn new(config: Config, query: String, scope: Option<String>, limit: Option<usize>) -> Self {
        Self {
            config,
            request: SearchRequest { query, scope, limit },
        }
    }
}

#[async_trait::async_trait]
impl Command for SearchCommand {
    async fn execute(&self) -> Result<()> {
        let client = connect(&self.config).await?;
        let hits = client.search(context::current(), self.request.clone()).await?;

        if hits.is_empty() {
            println!("没有匹配的笔记");
        }
        for hit in hits {
            println!("{} ({:.2})  {}", hit.name, hit.score, hit.path);
            for m in &hit.matches {
                println!("    {:<5} {}", m.field, m.snippet);
            }
        }
        Ok(())
    }
}

pub struct SuggestCommand {
    config: Config,
    prefix: String,
    limit: Option<usize>,
}

impl SuggestCommand {
    pub fn new(config: Config, prefix: String, limit: Option<usize>) -> Self {
        Self { config, prefix, limit }
    }
}

#[async_trait::async_trait]
impl Command for SuggestCommand {
    async fn execute(&self) -> Result<()> {
        let client = connect(&self.config).await?;
        for term in client.suggest(context::current(), self.prefix.clone(), self.limit).await? {
            println!("{term}");
        }
        Ok(())
    }
}

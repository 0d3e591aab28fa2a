use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store config: {0}")]
    Config(String),

    #[error("could not create connection pool: {0}")]
    PoolBuild(#[from] deadpool_postgres::CreatePoolError),

    #[error("could not get a database connection: {0}")]
    Connection(#[from] deadpool_postgres::PoolError),

    #[error("query failed: {0}")]
    Query(#[from] tokio_postgres::Error),

    #[error("unexpected result shape: {0}")]
    Decode(String),
}

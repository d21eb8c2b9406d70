//! HTTP API server
//!
//! Plain HTTP/1.1 on a tokio listener, one task per connection. The service is
//! shared read-only; the connection pool inside it is the only shared resource
//! that changes.

pub mod http;
pub mod routes;

use crate::error::Result;
use crate::service::QueryService;
use self::http::{read_request, ReadError, Response, Status};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

pub struct Server {
    listener: TcpListener,
    service: Arc<QueryService>,
    read_timeout: Duration,
}

impl Server {
    pub async fn bind(addr: &str, service: Arc<QueryService>, read_timeout: Duration) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            service,
            read_timeout,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is dropped or accept fails.
    pub async fn serve(self) -> Result<()> {
        info!("Server listening on http://{}", self.local_addr()?);

        loop {
            let (stream, peer) = self.listener.accept().await?;
            debug!(%peer, "New connection");
            let service = Arc::clone(&self.service);
            let read_timeout = self.read_timeout;
            tokio::spawn(async move {
                handle_connection(stream, service, read_timeout).await;
            });
        }
    }
}

async fn handle_connection(mut stream: TcpStream, service: Arc<QueryService>, read_timeout: Duration) {
    let response = match read_request(&mut stream, read_timeout).await {
        Ok(request) => routes::handle_request(&service, &request).await,
        Err(ReadError::Closed) => return,
        Err(ReadError::Timeout) => {
            warn!("Request read timeout");
            Response::error(Status::RequestTimeout, "Request read timeout")
        }
        Err(ReadError::TooLarge) => Response::error(Status::PayloadTooLarge, "Request too large"),
        Err(ReadError::Malformed(reason)) => {
            error!("Malformed request: {}", reason);
            Response::error(Status::BadRequest, &reason)
        }
    };

    response.write_to(&mut stream).await;
}

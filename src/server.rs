//! TCP front end: one JSON request per line, one JSON response per line

use crate::error::{LedgerError, Result};
use crate::network::MAX_LINE_LENGTH;
use crate::node::LedgerNode;
use crate::protocol::{Request, Response};
use crate::tickets::PurchaseRequest;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, warn};

/// Accept connections until the listener fails
pub async fn serve(listener: TcpListener, node: Arc<LedgerNode>) -> Result<()> {
    info!(addr = %listener.local_addr()?, node = %node.id(), "Serving ledger requests");
    loop {
        let (stream, peer) = listener.accept().await?;
        let node = Arc::clone(&node);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer, node).await {
                warn!(peer = %peer, error = %e, "Connection error");
            }
        });
    }
}

/// Bind `addr` and serve in a background task; returns the bound address
pub async fn spawn(addr: &str, node: Arc<LedgerNode>) -> Result<SocketAddr> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = serve(listener, node).await {
            warn!(error = %e, "Server stopped");
        }
    });
    Ok(local)
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, node: Arc<LedgerNode>) -> Result<()> {
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    while let Some(line) = framed.next().await {
        let line = line?;
        let response = match Request::from_line(&line) {
            Ok(request) => {
                debug!(peer = %peer, ?request, "Request received");
                dispatch(&node, request).await
            },
            Err(e) => Response::error(e.to_string()),
        };
        framed.send(response.to_line()?).await?;
    }
    Ok(())
}

/// Run one request against the node
pub async fn dispatch(node: &LedgerNode, request: Request) -> Response {
    match execute(node, request).await {
        Ok(response) => response,
        Err(e) => {
            if e.is_rejection() {
                debug!(error = %e, "Request rejected");
            } else {
                warn!(error = %e, "Request failed");
            }
            Response::error(e.to_string())
        },
    }
}

async fn execute(node: &LedgerNode, request: Request) -> Result<Response> {
    Ok(match request {
        Request::GetChain => {
            let snapshot = node.snapshot().await;
            Response::Chain {
                chain: snapshot.chain,
                length: snapshot.length,
            }
        },
        Request::MineBlock => Response::Mined {
            block: node.mine().await?,
        },
        Request::IsValid => Response::Valid {
            valid: node.is_valid().await,
        },
        Request::IssueTicket { ticket } => Response::Queued {
            index: node.issue_ticket(&ticket).await?,
        },
        Request::BuyTicket { purchase } => {
            let request = PurchaseRequest::from_fields(&purchase)?;
            Response::Queued {
                index: node.purchase_ticket(&request).await?,
            }
        },
        Request::ConnectNode { nodes } => {
            let nodes = nodes.ok_or_else(|| LedgerError::malformed("nodes"))?;
            Response::Peers {
                total_nodes: node.register_peers(nodes).await?,
            }
        },
        Request::ReplaceChain => {
            let outcome = node.reconcile().await;
            Response::Replaced {
                replaced: outcome.replaced,
                chain: outcome.chain.to_vec(),
            }
        },
        Request::GetTickets { owner } => Response::Tickets {
            tickets: node.tickets_by_owner(&owner).await,
            owner,
        },
    })
}

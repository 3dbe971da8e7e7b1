use async_trait::async_trait;

use crate::capture::PageInfo;
use crate::host::HostError;

/// Answers "which page is in front" for captures that arrive without a sender.
#[async_trait]
pub trait PageQuery: Send + Sync {
    async fn active_page(&self) -> Result<PageInfo, HostError>;
}

/// Desktop default: there is no browser to ask.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoActivePage;

#[async_trait]
impl PageQuery for NoActivePage {
    async fn active_page(&self) -> Result<PageInfo, HostError> {
        Err(HostError::Other("No active page to capture".to_string()))
    }
}

/// Always reports the same page, e.g. one passed on the command line.
#[derive(Debug, Clone)]
pub struct FixedPage(pub PageInfo);

#[async_trait]
impl PageQuery for FixedPage {
    async fn active_page(&self) -> Result<PageInfo, HostError> {
        Ok(self.0.clone())
    }
}

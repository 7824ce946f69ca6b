//! Browser session hosting the circuit simulator.
//!
//! Attaches to an already running Chrome (started with
//! `--remote-debugging-port`) through a WebDriver server, loads the
//! simulation, opens the serial monitor and starts the simulation.
//! Every console operation re-queries its element; no element handle
//! outlives a single call, so the reader and writer can share a session.

use std::time::Duration;

use async_trait::async_trait;
use thirtyfour::prelude::*;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::console::{Console, ConsoleError};

const CODE_EDITOR_BUTTON: &str = "CODE_EDITOR_ID";
const SERIAL_MONITOR_BUTTON: &str = "SERIAL_MONITOR_ID";
const START_SIMULATION_BUTTON: &str = "SIMULATION_ID";
const CODE_PANEL: &str = "code_panel";
const SERIAL_OUTPUT: &str = "code_panel__serial__content__text";
const SERIAL_INPUT: &str = "code_panel__serial__input";

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("simulation page not ready after {0:?}")]
    NotReady(Duration),

    #[error("webdriver error: {0}")]
    WebDriver(#[from] WebDriverError),
}

/// Where to find the browser and what to load in it.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub webdriver_url: String,
    pub debugger_address: String,
    pub simulation_url: String,
    pub ready_timeout: Duration,
}

/// A live simulator page with its serial monitor open.
pub struct SimulatorSession {
    driver: WebDriver,
    ready_timeout: Duration,
}

/// Attach to the browser and bring the simulation up.
///
/// Fails if the page never shows the code editor control within the
/// ready timeout. The browser session is quit before any error is
/// returned.
pub async fn open_session(config: &SessionConfig) -> Result<SimulatorSession, SessionError> {
    let mut caps = DesiredCapabilities::chrome();
    caps.set_debugger_address(config.debugger_address.as_str())?;
    let driver = WebDriver::new(config.webdriver_url.as_str(), caps).await?;

    let session = SimulatorSession {
        driver,
        ready_timeout: config.ready_timeout,
    };
    info!(url = %config.simulation_url, "opening simulation");
    if let Err(e) = session.prepare(&config.simulation_url).await {
        session.close().await;
        return Err(e);
    }
    Ok(session)
}

impl SimulatorSession {
    async fn prepare(&self, url: &str) -> Result<(), SessionError> {
        self.driver.goto(url).await?;
        self.driver
            .query(By::Id(CODE_EDITOR_BUTTON))
            .wait(self.ready_timeout, POLL_INTERVAL)
            .first()
            .await
            .map_err(|_| SessionError::NotReady(self.ready_timeout))?;

        self.open_code_panel().await?;
        self.driver
            .find(By::Id(SERIAL_MONITOR_BUTTON))
            .await?
            .click()
            .await?;
        self.driver
            .find(By::Id(START_SIMULATION_BUTTON))
            .await?
            .click()
            .await?;
        info!("simulation started");
        Ok(())
    }

    async fn code_panel_open(&self) -> Result<bool, SessionError> {
        let panel = self.driver.find(By::ClassName(CODE_PANEL)).await?;
        Ok(panel.css_value("right").await? == "0px")
    }

    async fn open_code_panel(&self) -> Result<(), SessionError> {
        if self.code_panel_open().await? {
            return Ok(());
        }
        debug!("opening code panel");
        self.driver
            .find(By::Id(CODE_EDITOR_BUTTON))
            .await?
            .click()
            .await?;

        let deadline = Instant::now() + self.ready_timeout;
        while !self.code_panel_open().await? {
            if Instant::now() >= deadline {
                return Err(SessionError::NotReady(self.ready_timeout));
            }
            time::sleep(POLL_INTERVAL).await;
        }
        Ok(())
    }

    /// End the WebDriver session. Failures are logged, not returned.
    pub async fn close(self) {
        if let Err(e) = self.driver.quit().await {
            warn!(error = %e, "failed to close browser session");
        } else {
            info!("browser session closed");
        }
    }
}

#[async_trait]
impl Console for SimulatorSession {
    async fn read_text(&self) -> Result<Option<String>, ConsoleError> {
        let output = self
            .driver
            .find(By::ClassName(SERIAL_OUTPUT))
            .await
            .map_err(|_| ConsoleError::ElementMissing(SERIAL_OUTPUT))?;
        let text = output
            .inner_html()
            .await
            .map_err(|e| ConsoleError::Unavailable(e.to_string()))?;
        Ok(Some(text))
    }

    async fn submit_input(&self, text: &str) -> Result<(), ConsoleError> {
        let input = self
            .driver
            .find(By::ClassName(SERIAL_INPUT))
            .await
            .map_err(|_| ConsoleError::ElementMissing(SERIAL_INPUT))?;
        input
            .send_keys(text)
            .await
            .map_err(|e| ConsoleError::Unavailable(e.to_string()))?;
        input
            .send_keys(Key::Enter)
            .await
            .map_err(|e| ConsoleError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

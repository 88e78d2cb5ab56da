// Multi-channel notification fan-out.
//
// One event goes to mail, short message and the persistent stream. Each
// channel is a NotificationChannel; the Dispatcher calls all of them and
// reports per-channel outcomes. The persistent stream resolves the user's
// live connection through the ConnectionRegistry.

pub mod channel;
pub mod directory;
pub mod dispatcher;
pub mod mail;
pub mod registry;
pub mod sms;
pub mod stream;

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use channel::NotificationChannel;
use directory::UserDirectory;
use dispatcher::Dispatcher;
use mail::{HttpMailTransport, MailChannel};
use registry::ConnectionRegistry;
use sms::{SmsChannel, TwilioSmsTransport};
use stream::StreamChannel;

/// Build the production dispatcher from configuration.
///
/// Missing mail or SMS credentials don't stop startup. Those channels
/// report `false` on every send until configured.
pub fn build_dispatcher(
    config: &Config,
    directory: Arc<dyn UserDirectory>,
    registry: Arc<ConnectionRegistry>,
) -> Result<Dispatcher> {
    let mail_transport = HttpMailTransport::new(
        &config.mail_api_url,
        &config.mail_api_key,
        config.transport_timeout,
    )?;
    let sms_transport = TwilioSmsTransport::new(
        &config.sms_api_url,
        &config.sms_account_sid,
        &config.sms_auth_token,
        &config.sms_from_number,
        config.transport_timeout,
    )?;

    let mail: Arc<dyn NotificationChannel> = Arc::new(MailChannel::new(
        Arc::clone(&directory),
        Arc::new(mail_transport),
        config.from_email.clone(),
    ));
    let short_message: Arc<dyn NotificationChannel> =
        Arc::new(SmsChannel::new(directory, Arc::new(sms_transport)));
    let stream: Arc<dyn NotificationChannel> = Arc::new(StreamChannel::new(registry));

    Ok(Dispatcher::new(
        mail,
        short_message,
        stream,
        config.transport_timeout,
    ))
}

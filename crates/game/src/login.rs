//! # Login Endpoint
//!
//! Answers the client version handshake with a world selection and records
//! submitted credentials.

use necromancy_core::{Endpoint, LogLevel, LogSink, Result};
use necromancy_network::{Dispatch, EndpointHandler, OpcodeTable, PacketContext, PacketRouter, Session};
use necromancy_protocol::{
    Authenticate, AuthenticateReply, ClientVersion, LoginOpcodeIn, LoginOpcodeOut, PacketReader,
    PacketWriter, SelectWorld,
};
use std::sync::Arc;

/// Login endpoint settings
#[derive(Debug, Clone)]
pub struct LoginOptions {
    /// First address string of the select-world reply
    pub primary_address: String,

    /// Second address string of the select-world reply
    pub secondary_address: String,

    /// Answer credential submissions with an authenticate reply
    ///
    /// The client's expected answer is not confirmed, so this stays off
    /// unless enabled in the server options.
    pub send_login_response: bool,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            primary_address: "127.0.0.1".to_string(),
            secondary_address: "127.0.0.1".to_string(),
            send_login_response: false,
        }
    }
}

/// Login endpoint handler
pub struct LoginServer {
    router: PacketRouter,
}

impl LoginServer {
    /// Create a login endpoint writing its records to `sink`
    pub fn new(options: LoginOptions, sink: Arc<dyn LogSink>) -> Self {
        Self {
            router: PacketRouter::new(Endpoint::Login, Self::opcode_table(options), sink),
        }
    }

    /// Build the login opcode table
    ///
    /// # Handled Opcodes
    /// - `0x0557` client version: replies with `0x8C84` select world
    /// - `0x93AD` authenticate: logs the credentials, optionally replies with `0xEFDD`
    pub fn opcode_table(options: LoginOptions) -> OpcodeTable {
        let options = Arc::new(options);
        let mut table = OpcodeTable::new();

        let version_options = options.clone();
        table.register_function(LoginOpcodeIn::ClientVersion.as_u16(), move |ctx, reader| {
            handle_client_version(ctx, reader, &version_options)
        });

        table.register_function(LoginOpcodeIn::Authenticate.as_u16(), move |ctx, reader| {
            handle_authenticate(ctx, reader, &options)
        });

        table
    }
}

impl EndpointHandler for LoginServer {
    fn endpoint(&self) -> Endpoint {
        Endpoint::Login
    }

    fn on_connected(&self, session: &dyn Session) {
        self.router.connected(session);
    }

    fn on_disconnected(&self, session: &dyn Session) {
        self.router.disconnected(session);
    }

    fn on_received_data(&self, session: &dyn Session, data: &[u8]) -> Dispatch {
        self.router.route(session, data)
    }
}

fn handle_client_version(
    ctx: &PacketContext<'_>,
    reader: &mut PacketReader<'_>,
    options: &LoginOptions,
) -> Result<()> {
    let version = ClientVersion::decode(reader)?;
    tracing::debug!(
        "Connection {} client version {}.{}",
        ctx.session.id(),
        version.major,
        version.minor
    );

    let reply = SelectWorld::new(options.primary_address.as_str(), options.secondary_address.as_str());
    let mut writer = PacketWriter::new();
    reply.encode(&mut writer);
    ctx.send(LoginOpcodeOut::SelectWorld.as_u16(), &writer)
}

fn handle_authenticate(
    ctx: &PacketContext<'_>,
    reader: &mut PacketReader<'_>,
    options: &LoginOptions,
) -> Result<()> {
    let auth = Authenticate::decode(reader)?;
    ctx.log(
        LogLevel::Info,
        &format!(
            "Account:{} Password:{} Mac:{} Unknown:{}",
            auth.account_name, auth.password, auth.mac_address, auth.unknown
        ),
    );

    if options.send_login_response {
        let mut writer = PacketWriter::new();
        AuthenticateReply::default().encode(&mut writer);
        ctx.send(LoginOpcodeOut::Authenticate.as_u16(), &writer)?;
    }

    Ok(())
}

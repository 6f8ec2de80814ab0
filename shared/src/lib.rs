//! # Replica Shared
//! Replicated object trees for peer-to-peer multiplayer games: versioned
//! values, authority-aware nodes, and the peer session that carries their
//! payloads.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

pub use naia_serde::{
    BitCounter, BitReader, BitWrite, BitWriter, ConstBitLength, FileBitWriter, Serde, SerdeErr,
    SignedInteger, SignedVariableInteger, UnsignedInteger, UnsignedVariableInteger, MTU_SIZE_BYTES,
};
pub use naia_socket_shared::{Instant, TimeQueue};

mod connection;
mod messages;
mod replicator;
mod types;
mod world;

pub use connection::{
    channel::{ChannelMode, DataChannel},
    compression_config::{CompressionConfig, CompressionMode},
    decoder::{Decoder, MAX_DECOMPRESSED_SIZE},
    encoder::Encoder,
    error::{ConnectionError, DecoderError, EncoderError, TransportError},
    peer_connection::PeerState,
    peer_session::{InboundMessage, PeerRef, PeerSession, SessionEvents},
    session_config::SessionConfig,
};
pub use messages::{error::MessageError, message::Message, message_type::MessageType};
pub use replicator::{Replicator, FIRST_CLIENT_ID};
pub use types::{ChildId, ClientId, PropNumber, SeqNum, SEQ_STEP};
pub use world::{
    node::{
        authority::{NetworkBehavior, ReplicationContext},
        error::NodeError,
        game_object::{GameObject, GameObjectState, Phase, Steppable},
        name::NameParams,
        prop_handler::{Prop, PropHandler},
        replicated_node::{
            dispose_object, initialize_object, step_object, ChildFactory, ReplicatedNode,
            MAX_PENDING_CHILDREN,
        },
    },
    value::{
        channel_kind::{ChannelKind, ChannelKinds},
        replicate::{Replicate, FLOAT_EPSILON},
        replicated_value::{PublishRecord, ReplicatedValue},
        value_config::{ConditionalInterval, ValueConfig, DEFAULT_REDUNDANCY},
    },
    wire::{DataMap, WireError, WireKey, WireValue, MAX_DEPTH},
};

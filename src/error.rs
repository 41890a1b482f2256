use std::{io, path::PathBuf};

use smithay_client_toolkit::{reexports::calloop, shm::CreatePoolError};
use thiserror::Error;
use wayland_client::{
    ConnectError,
    globals::{BindError, GlobalError},
};

/// Anything that stops the overlay from coming up at all.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("unable to connect to a Wayland compositor")]
    Connect(#[from] ConnectError),
    #[error("failed to read the compositor globals")]
    Globals(#[from] GlobalError),
    #[error("compositor does not support '{global}'")]
    MissingGlobal {
        global: &'static str,
        #[source]
        source: BindError,
    },
    #[error("failed to create the shared memory pool")]
    Pool(#[from] CreatePoolError),
    #[error("event loop failure")]
    EventLoop(#[from] calloop::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Load(#[from] config::ConfigError),
    #[error("no usable font named '{0}'")]
    Font(String),
}

#[derive(Debug, Error)]
pub enum IconError {
    #[error("icon '{0}' not found")]
    NotFound(String),
    #[error("failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode {path:?}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to parse svg {path:?}")]
    Svg {
        path: PathBuf,
        #[source]
        source: resvg::usvg::Error,
    },
    #[error("icon {0:?} has no drawable size")]
    Empty(PathBuf),
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("'{0}' has no command to run")]
    NoExec(String),
    #[error("failed to spawn '{command}'")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to initialise inotify")]
    Init(#[source] io::Error),
    #[error("failed to watch {path:?}")]
    Watch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no application directory could be watched")]
    NothingWatched,
}

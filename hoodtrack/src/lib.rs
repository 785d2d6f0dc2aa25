#![allow(clippy::too_many_arguments)]

pub mod auto_grotto;
pub mod explore;
pub mod settings;
pub mod solve;
pub mod text_format;
pub mod tracker;

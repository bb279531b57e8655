pub mod cli;
pub mod config;
pub mod consts;
pub mod conversion;
pub mod crds;
pub mod defaulting;
pub mod main_actions;
pub mod operator;
pub mod quantity;
pub mod validation;
pub mod webhook;

pub mod activities;
pub mod crawler;
pub mod extractor;
pub mod hasher;
pub mod links;
pub mod oracles;
pub mod resolver;
pub mod tree;
pub mod workflows;

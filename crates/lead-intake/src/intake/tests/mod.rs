mod catalog;
mod common;
mod guard;

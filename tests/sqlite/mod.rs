mod accessor;
mod config;
mod entity;
mod records;
mod relationships;

mod climb;
mod config;
mod cruise;
mod electric;
mod multicopter;
mod sweep;

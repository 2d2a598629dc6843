pub mod support;

mod cycle_guard;
mod gateway_session;
mod sequencing;
mod shutdown;
mod startup;

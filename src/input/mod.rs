pub mod action;
pub mod curve;
pub mod dispatcher;
pub mod event;
pub mod functor;
pub mod logical_device;
pub mod macros;
pub mod mode;
pub mod output;
pub mod runtime;
pub mod source;
pub mod target;
pub mod timer;

#[cfg(test)]
pub mod dispatcher_test;
#[cfg(test)]
pub mod mode_test;
#[cfg(test)]
pub mod timer_test;

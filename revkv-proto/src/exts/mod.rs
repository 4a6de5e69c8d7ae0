//! Hand-written extension impls on the wire types.

mod record_ext;
mod watch_ext;

#[cfg(test)]
mod record_ext_test;
#[cfg(test)]
mod watch_ext_test;

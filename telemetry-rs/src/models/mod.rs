pub(crate) mod shutdown;

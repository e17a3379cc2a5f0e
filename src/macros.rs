//! Terse macros for everyday usage

/// Build an [`ArgConfig`](crate::args::ArgConfig) from `key => value` pairs, in order.
#[macro_export]
macro_rules! args {
    ( $( $k:expr => $v:expr ),* $(,)? ) => {{
        let mut __c = $crate::args::ArgConfig::new();
        $( __c.insert($k, $v); )*
        __c
    }};
}

/// Build a [`CommandSpec`](crate::cmd::CommandSpec) from tokens.
#[macro_export]
macro_rules! cmd {
    ($cfg:expr, style: $style:expr) => {{
        $crate::cmd::CommandSpec::from_config(& $cfg, $style)
    }};
    ( $( $t:expr ),+ $(,)? ) => {{
        $crate::cmd::CommandSpec::new([ $( ::std::string::ToString::to_string(&$t) ),+ ])
    }};
}

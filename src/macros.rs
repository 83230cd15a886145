// Fieldless enums that travel as fixed keywords in query strings, URLs and
// CLI flags. The first keyword listed for a variant is the canonical one;
// the rest are accepted aliases when parsing.
macro_rules! keyword_enum {
  (
    $(#[$meta:meta])*
    pub enum $name:ident {
      $($(#[$vmeta:meta])* $variant:ident => [$canonical:literal $(, $alias:literal)*]),+ $(,)?
    }
  ) => {
    $(#[$meta])*
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum $name {
      $($(#[$vmeta])* $variant),+
    }

    impl $name {
      pub const ALL: &'static [$name] = &[$($name::$variant),+];

      pub fn as_str(self) -> &'static str {
        match self {
          $($name::$variant => $canonical),+
        }
      }
    }

    impl std::str::FromStr for $name {
      type Err = String;

      fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        $(
          if normalized == $canonical $(|| normalized == $alias)* {
            return Ok($name::$variant);
          }
        )+
        Err(format!(
          "Unknown {} '{}'. Expected one of: {}.",
          stringify!($name),
          value.trim(),
          [$($canonical),+].join(", ")
        ))
      }
    }

    impl std::fmt::Display for $name {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
      }
    }
  };
}

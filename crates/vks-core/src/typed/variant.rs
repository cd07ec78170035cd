//! TypeVariant trait - 閉じた列挙型ファミリーの定義
//!
//! # 学習ポイント
//! - Associated Constants (`const FAMILY`, `const VARIANTS`)
//! - declarative macro による exhaustive match の生成
//!
//! ファミリーを拡張するときは `type_family!` の定義に variant を足すだけです。
//! 実行時に variant を登録する経路はありません。

use std::fmt;
use std::hash::Hash;

/// TypeVariant は閉じた名前付き variant の集合（ファミリー）の 1 要素
///
/// # 使用例
/// ```ignore
/// type_family! {
///     /// Kind of an order.
///     pub enum OrderType: "OrderType" {
///         Standard => "Standard",
///         Express => "Express",
///     }
/// }
///
/// assert_eq!(OrderType::Express.name(), "Express");
/// assert_eq!(OrderType::from_name("Express"), Some(OrderType::Express));
/// ```
///
/// # Trait Bounds
/// - `Copy + Eq + Hash`: singleton 値として扱うため
/// - `Send + Sync + 'static`: 共有レジストリから参照するため
pub trait TypeVariant: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// ファミリー名（例: `OrderType`）
    const FAMILY: &'static str;

    /// 宣言順の全 variant
    const VARIANTS: &'static [Self];

    /// 永続化される表示名
    fn name(&self) -> &'static str;

    /// 表示名から variant を引く（完全一致・大文字小文字を区別）
    fn from_name(name: &str) -> Option<Self>;

    /// 宣言順の全表示名
    fn names() -> Vec<&'static str> {
        Self::VARIANTS.iter().map(|v| v.name()).collect()
    }
}

/// Declares a closed type family: an enum, its display names and the
/// [`TypeVariant`] impl with exhaustive matches in both directions.
///
/// Serialization goes through the display name, so a variant stored in a
/// JSON document looks exactly like the typed-enum column.
#[macro_export]
macro_rules! type_family {
    (
        $(#[$meta:meta])*
        $vis:vis enum $family:ident : $family_name:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $name:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $family {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $crate::typed::TypeVariant for $family {
            const FAMILY: &'static str = $family_name;
            const VARIANTS: &'static [Self] = &[ $( $family::$variant ),+ ];

            fn name(&self) -> &'static str {
                match self {
                    $( $family::$variant => $name ),+
                }
            }

            fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $name => Some($family::$variant), )+
                    _ => None,
                }
            }
        }

        impl ::std::fmt::Display for $family {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::typed::TypeVariant::name(self))
            }
        }

        impl ::serde::Serialize for $family {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str($crate::typed::TypeVariant::name(self))
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $family {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let name = <::std::borrow::Cow<'de, str> as ::serde::Deserialize>::deserialize(deserializer)?;
                <$family as $crate::typed::TypeVariant>::from_name(&name).ok_or_else(|| {
                    ::serde::de::Error::custom(format!(
                        "unknown {} variant '{}'",
                        $family_name, name
                    ))
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    type_family! {
        enum Fruit: "Fruit" {
            Apple => "Apple",
            Pear => "pear-ish",
        }
    }

    #[test]
    fn names_follow_declaration_order() {
        assert_eq!(Fruit::names(), vec!["Apple", "pear-ish"]);
        assert_eq!(Fruit::VARIANTS, &[Fruit::Apple, Fruit::Pear]);
    }

    #[test]
    fn from_name_is_exact_and_case_sensitive() {
        assert_eq!(Fruit::from_name("pear-ish"), Some(Fruit::Pear));
        assert_eq!(Fruit::from_name("Pear"), None);
        assert_eq!(Fruit::from_name("apple"), None);
        assert_eq!(Fruit::from_name(" Apple"), None);
    }

    #[test]
    fn serde_uses_display_name() {
        assert_eq!(serde_json::to_string(&Fruit::Pear).unwrap(), "\"pear-ish\"");
        let back: Fruit = serde_json::from_str("\"Apple\"").unwrap();
        assert_eq!(back, Fruit::Apple);

        let err = serde_json::from_str::<Fruit>("\"Banana\"").unwrap_err();
        assert!(err.to_string().contains("unknown Fruit variant 'Banana'"));
    }
}

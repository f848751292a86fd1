/// Expands to a doc line linking to a section of the JVM specification.
macro_rules! see_jvm_spec {
    ($chapter:literal, $section:literal $(, $sub:literal)*) => {
        concat!(
            "See the [JVM Specification §",
            $chapter, ".", $section, $(".", $sub,)*
            "](https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-",
            $chapter, ".html#jvms-",
            $chapter, ".", $section, $(".", $sub,)*
            ") for more information."
        )
    };
}

/// Defines a structure whose fields are encoded one after another in declaration order.
macro_rules! layout {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                pub $field:ident: $ty:ty
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        pub struct $name {
            $(
                $(#[$field_meta])*
                pub $field: $ty,
            )+
        }

        impl $crate::reader::Decode for $name {
            fn measure(
                reader: &mut $crate::reader::ClassReader<'_>,
                size: &mut usize,
            ) -> Result<(), $crate::errors::DecodeError> {
                $(<$ty as $crate::reader::Decode>::measure(reader, size)?;)+
                Ok(())
            }

            fn decode(
                reader: &mut $crate::reader::ClassReader<'_>,
            ) -> Result<Self, $crate::errors::DecodeError> {
                Ok(Self {
                    $($field: $crate::reader::Decode::decode(reader)?,)+
                })
            }
        }

        impl $crate::encoding::Encode for $name {
            fn encode<W, I>(
                &self,
                writer: &mut W,
                import: &mut I,
            ) -> Result<(), $crate::errors::EncodeError>
            where
                W: std::io::Write + ?Sized,
                I: $crate::encoding::ConstantImport + ?Sized,
            {
                $($crate::encoding::Encode::encode(&self.$field, writer, import)?;)+
                Ok(())
            }
        }
    };
}

pub(crate) use layout;
pub(crate) use see_jvm_spec;

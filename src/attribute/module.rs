use crate::{
    access_flags::{ExportsFlags, ModuleFlags, OpensFlags, RequiresFlags},
    constant_pool::{
        ClassConstantHandle, ModuleConstantHandle, PackageConstantHandle, Utf8ConstantHandle,
    },
    intrinsics::{layout, see_jvm_spec},
};

layout! {
    /// The `Module` attribute of a module descriptor.
    #[doc = see_jvm_spec!(4, 7, 25)]
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
    pub struct ModuleAttribute {
        /// The name of the module.
        pub name: ModuleConstantHandle,
        /// The flags of the module.
        pub flags: ModuleFlags,
        /// The version of the module, or nil if it has none.
        pub version: Utf8ConstantHandle,
        /// The dependencies of the module.
        pub requires: Vec<Requires>,
        /// The packages exported by the module.
        pub exports: Vec<Exports>,
        /// The packages opened by the module.
        pub opens: Vec<Opens>,
        /// The services used by the module.
        pub uses: Vec<ClassConstantHandle>,
        /// The service implementations provided by the module.
        pub provides: Vec<Provides>,
    }
}

layout! {
    /// A `requires` directive.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Requires {
        /// The module depended on.
        pub module: ModuleConstantHandle,
        /// The flags of the dependence.
        pub flags: RequiresFlags,
        /// The version of the module depended on, or nil if it is not recorded.
        pub version: Utf8ConstantHandle,
    }
}

layout! {
    /// An `exports` directive.
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
    pub struct Exports {
        /// The exported package.
        pub package: PackageConstantHandle,
        /// The flags of the export.
        pub flags: ExportsFlags,
        /// The modules the package is exported to, or empty for an unqualified export.
        pub to: Vec<ModuleConstantHandle>,
    }
}

layout! {
    /// An `opens` directive.
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
    pub struct Opens {
        /// The opened package.
        pub package: PackageConstantHandle,
        /// The flags of the opening.
        pub flags: OpensFlags,
        /// The modules the package is opened to, or empty for an unqualified opening.
        pub to: Vec<ModuleConstantHandle>,
    }
}

layout! {
    /// A `provides` directive.
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
    pub struct Provides {
        /// The service interface.
        pub service: ClassConstantHandle,
        /// The implementations of the service.
        pub implementations: Vec<ClassConstantHandle>,
    }
}

layout! {
    /// The `ModulePackages` attribute.
    #[doc = see_jvm_spec!(4, 7, 26)]
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
    pub struct ModulePackagesAttribute {
        /// All packages of the module.
        pub packages: Vec<PackageConstantHandle>,
    }
}

layout! {
    /// The `ModuleMainClass` attribute.
    #[doc = see_jvm_spec!(4, 7, 27)]
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct ModuleMainClassAttribute {
        /// The main class of the module.
        pub main_class: ClassConstantHandle,
    }
}

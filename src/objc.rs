//! Objective-C method naming.
//!
//! The Objective-C 2 runtime ABI lays class metadata out in fixed records:
//! `__objc_classlist` holds pointers to class objects in `__objc_data`, each of
//! which points at its read-only data in `__objc_const`. The read-only data names
//! the class and points at its method list. Class methods live on the
//! metaclass, reached through the class object's `isa`.
//!
//! - `class`: Class object and read-only data records.
//! - `methods`: Method list walking.
//! - `resolver`: The naming pass over the whole class list.

pub mod class;
pub mod methods;
pub mod resolver;

pub use class::{ClassObject, ClassReadOnly};
pub use methods::{methods_of, Method, MethodRecord, Methods};
pub use resolver::{method_name, run, MethodKind, ResolveReport};

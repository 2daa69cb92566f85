pub mod cat;
pub mod ls;
pub mod mkdir;
pub mod mv;
pub mod put;
pub mod rm;
pub mod stat;
pub mod truncate;

crate::command_enum! {
    (Ls, ls::Ls),
    (Cat, cat::Cat),
    (Put, put::Put),
    (Rm, rm::Rm),
    (Mv, mv::Mv),
    (Stat, stat::Stat),
    (Mkdir, mkdir::Mkdir),
    (Truncate, truncate::Truncate),
}

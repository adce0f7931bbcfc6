use crate::location::LocationResolver;

pub struct AppState<S> {
    pub resolver: LocationResolver<S>,
}

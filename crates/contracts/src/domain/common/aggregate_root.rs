/// Корень агрегата: индекс и имя коллекции задают имя таблицы
pub trait AggregateRoot {
    /// Индекс агрегата в системе (например, "a001")
    fn aggregate_index() -> &'static str;

    /// Имя коллекции (например, "equipment")
    fn collection_name() -> &'static str;

    /// Полное имя агрегата, оно же имя таблицы (например, "a001_equipment")
    fn full_name() -> String {
        format!("{}_{}", Self::aggregate_index(), Self::collection_name())
    }
}

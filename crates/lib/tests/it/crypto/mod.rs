/*!
 * Key handling as seen through the datasources: missing keys, rotation,
 * wrapped keys and tampered rows.
 */
